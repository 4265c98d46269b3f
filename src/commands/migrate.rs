use anyhow::Result;

use crate::commands::CommandReport;
use crate::config::MigrationConfig;
use crate::matrix::{AdminClient, ImpersonationClient};
use crate::migrate::{self, MigrationSummary};
use crate::rocketchat::paths::resolve_paths;

fn summarize(report: &mut CommandReport, summary: &MigrationSummary) {
    report.detail(format!("rooms.created={}", summary.rooms.created));
    report.detail(format!("rooms.resolved={}", summary.rooms.resolved));
    report.detail(format!("users.provisioned={}", summary.users.provisioned));
    report.detail(format!("users.failed={}", summary.users.failed));
    report.detail(format!("users.skipped={}", summary.users.skipped));
    report.detail(format!("messages.sent={}", summary.messages.sent));
    report.detail(format!("messages.replies={}", summary.messages.replies));
    report.detail(format!(
        "messages.attachments={}",
        summary.messages.attachments
    ));
    report.detail(format!("messages.recovered={}", summary.messages.recovered));
    report.detail(format!("messages.skipped={}", summary.messages.skipped));
    report.detail(format!("messages.failed={}", summary.messages.failed));

    if summary.users.failed > 0 {
        report.issue(format!(
            "{} user(s) could not be provisioned",
            summary.users.failed
        ));
    }
    if summary.messages.failed > 0 {
        report.issue(format!(
            "{} message(s) could not be replayed; rerun with -v for details",
            summary.messages.failed
        ));
    }
}

pub fn run(cfg: &MigrationConfig) -> Result<CommandReport> {
    let (admin_token, app_token) = cfg.require_migration_tokens()?;
    let paths = resolve_paths(&cfg.inputs);
    let mut report = CommandReport::new("migrate");

    report.detail(format!("inputs={}", cfg.inputs.display()));
    report.detail(format!("hostname={}", cfg.hostname));
    report.detail(format!("api_base={}", cfg.api_base()));

    let missing = paths.missing();
    if !missing.is_empty() {
        let names = missing
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        anyhow::bail!("missing export file(s): {}", names.join(", "));
    }

    let admin = AdminClient::new(cfg.api_base(), admin_token)?;
    let sender = ImpersonationClient::new(cfg.api_base(), app_token)?;
    let summary = migrate::run_pipeline(&paths, &cfg.hostname, &admin, &sender)?;

    summarize(&mut report, &summary);
    Ok(report)
}

use anyhow::{Context, Result};

use crate::commands::CommandReport;
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::matrix::client;

/// Password login for the admin account. Prints the token; nothing is
/// migrated in the same run.
pub fn run(cfg: &MigrationConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("login");
    let api_base = cfg.api_base();
    report.detail(format!("api_base={api_base}"));

    let resp = client::login(&api_base, &cfg.admin.username, &cfg.admin.password)?;
    if !resp.is_success() {
        return Err(MigrationError::LoginFailed {
            status: resp.status,
        }
        .into());
    }

    let token = resp
        .str_field("access_token")
        .context("login response missing access_token")?;
    if let Some(user_id) = resp.str_field("user_id") {
        report.detail(format!("user_id={user_id}"));
    }
    report.detail(format!("access_token={token}"));
    report.detail("rerun with -t <token> -a <application token> to migrate");
    Ok(report)
}

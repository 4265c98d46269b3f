use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use crate::commands::{self, CommandReport};
use crate::config::{self, ConfigOverrides};
use crate::logging;

/// Launches a RocketChat to Matrix migration.
///
/// Without an admin token the tool logs in with the admin password, prints
/// the token and exits. With both tokens it replays the export.
#[derive(Debug, Parser)]
#[command(name = "rc2matrix", version, about = "Launches RocketChat to Matrix migration")]
pub struct Cli {
    /// Inputs folder holding the RocketChat export [default: inputs/]
    #[arg(short = 'i', long = "inputs")]
    pub inputs: Option<PathBuf>,

    /// Matrix server name [default: localhost]
    #[arg(short = 'n', long = "hostname")]
    pub hostname: Option<String>,

    /// HTTP base of the homeserver [default: https://<hostname>]
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Admin username [default: admin]
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,

    /// Admin password [default: password]
    #[arg(short = 'p', long = "password")]
    pub password: Option<String>,

    /// Admin access token
    #[arg(short = 't', long = "token")]
    pub token: Option<String>,

    /// Application service token used to post as migrated users
    #[arg(short = 'a', long = "apptoken")]
    pub apptoken: Option<String>,

    /// Verbose diagnostics on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long = "json")]
    pub json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            inputs: self.inputs.clone(),
            hostname: self.hostname.clone(),
            base_url: self.base_url.clone(),
            admin_username: self.username.clone(),
            admin_password: self.password.clone(),
            admin_token: self.token.clone(),
            app_token: self.apptoken.clone(),
            verbose: self.verbose,
        }
    }
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.overrides())?;
    logging::init(cfg.verbose);
    for line in cfg.describe() {
        debug!("{line}");
    }

    let report = if cfg.admin.token.is_none() {
        commands::login::run(&cfg)?
    } else {
        commands::migrate::run(&cfg)?
    };
    print_report(&report, cli.json)
}

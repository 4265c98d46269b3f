use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::redact;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
    pub token: Option<String>,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub inputs: PathBuf,
    /// Server name used in Matrix user ids (`@user:<hostname>`).
    pub hostname: String,
    /// HTTP base of the homeserver. Derived from `hostname` when unset.
    pub base_url: Option<String>,
    pub admin: AdminCredentials,
    pub app_token: Option<String>,
    pub verbose: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            inputs: PathBuf::from("inputs/"),
            hostname: "localhost".to_string(),
            base_url: None,
            admin: AdminCredentials::default(),
            app_token: None,
            verbose: false,
        }
    }
}

impl MigrationConfig {
    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.hostname),
        }
    }

    /// One line per setting with credentials masked.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("inputs={}", self.inputs.display()),
            format!("hostname={}", self.hostname),
            format!("api_base={}", self.api_base()),
            format!("admin.username={}", self.admin.username),
            format!(
                "admin.token={}",
                self.admin.token.as_deref().map(redact).unwrap_or_default()
            ),
            format!(
                "app_token={}",
                self.app_token.as_deref().map(redact).unwrap_or_default()
            ),
            format!("verbose={}", self.verbose),
        ]
    }

    /// Migration needs both credential scopes.
    pub fn require_migration_tokens(&self) -> Result<(&str, &str)> {
        let admin = self
            .admin
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("admin token is required for migration (-t)"))?;
        let app = self
            .app_token
            .as_deref()
            .ok_or_else(|| anyhow!("application token is required for migration (-a)"))?;
        Ok((admin, app))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAdminCredentials {
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMigrationConfig {
    inputs: Option<PathBuf>,
    hostname: Option<String>,
    base_url: Option<String>,
    admin: Option<PartialAdminCredentials>,
    app_token: Option<String>,
    verbose: Option<bool>,
}

/// Values given on the command line; `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub inputs: Option<PathBuf>,
    pub hostname: Option<String>,
    pub base_url: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_token: Option<String>,
    pub app_token: Option<String>,
    pub verbose: bool,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(cfg: &MigrationConfig) -> Result<()> {
    if cfg.hostname.trim().is_empty() {
        return Err(anyhow!("invalid hostname: cannot be empty"));
    }
    if let Some(url) = &cfg.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(anyhow!(
            "invalid base url `{url}`: must start with http:// or https://"
        ));
    }
    if cfg.inputs.as_os_str().is_empty() {
        return Err(anyhow!("invalid inputs directory: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(custom) = env_non_empty("RC2M_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("rc2matrix").join("config.toml"))
}

fn merge_file_config(base: &mut MigrationConfig, explicit: Option<&Path>) -> Result<()> {
    let Some(path) = resolve_config_path(explicit) else {
        return Ok(());
    };
    if !path.exists() {
        if explicit.is_some() {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialMigrationConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(inputs) = parsed.inputs {
        base.inputs = inputs;
    }
    if let Some(hostname) = non_empty(parsed.hostname) {
        base.hostname = hostname;
    }
    if let Some(base_url) = non_empty(parsed.base_url) {
        base.base_url = Some(base_url);
    }
    if let Some(admin) = parsed.admin {
        if let Some(username) = non_empty(admin.username) {
            base.admin.username = username;
        }
        if let Some(password) = admin.password {
            base.admin.password = password;
        }
        if let Some(token) = non_empty(admin.token) {
            base.admin.token = Some(token);
        }
    }
    if let Some(app_token) = non_empty(parsed.app_token) {
        base.app_token = Some(app_token);
    }
    if let Some(verbose) = parsed.verbose {
        base.verbose = verbose;
    }
    Ok(())
}

fn apply_env(cfg: &mut MigrationConfig) {
    if let Some(inputs) = env_non_empty("RC2M_INPUTS") {
        cfg.inputs = PathBuf::from(inputs);
    }
    cfg.hostname = env_or_string("RC2M_HOSTNAME", &cfg.hostname);
    if let Some(url) = env_non_empty("RC2M_BASE_URL") {
        cfg.base_url = Some(url);
    }
    cfg.admin.username = env_or_string("RC2M_ADMIN_USER", &cfg.admin.username);
    if let Ok(password) = env::var("RC2M_ADMIN_PASSWORD") {
        cfg.admin.password = password;
    }
    if let Some(token) = env_non_empty("RC2M_ADMIN_TOKEN") {
        cfg.admin.token = Some(token);
    }
    if let Some(token) = env_non_empty("RC2M_APP_TOKEN") {
        cfg.app_token = Some(token);
    }
    cfg.verbose = env_or_bool("RC2M_VERBOSE", cfg.verbose);
}

fn apply_overrides(cfg: &mut MigrationConfig, overrides: ConfigOverrides) {
    if let Some(inputs) = overrides.inputs {
        cfg.inputs = inputs;
    }
    if let Some(hostname) = non_empty(overrides.hostname) {
        cfg.hostname = hostname;
    }
    if let Some(url) = non_empty(overrides.base_url) {
        cfg.base_url = Some(url);
    }
    if let Some(username) = non_empty(overrides.admin_username) {
        cfg.admin.username = username;
    }
    if let Some(password) = overrides.admin_password {
        cfg.admin.password = password;
    }
    if let Some(token) = non_empty(overrides.admin_token) {
        cfg.admin.token = Some(token);
    }
    if let Some(token) = non_empty(overrides.app_token) {
        cfg.app_token = Some(token);
    }
    cfg.verbose |= overrides.verbose;
}

pub fn load_config(overrides: ConfigOverrides) -> Result<MigrationConfig> {
    let mut cfg = MigrationConfig::default();
    merge_file_config(&mut cfg, overrides.config_path.as_deref())?;
    apply_env(&mut cfg);
    apply_overrides(&mut cfg, overrides);

    validate(&cfg)?;
    Ok(cfg)
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Secrets and environment-specific values, loaded from env vars.
/// Everything else lives in the TOML [`FileConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Bearer token required on every admin route.
    pub admin_token: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            admin_token: std::env::var("ADMIN_TOKEN").context("ADMIN_TOKEN must be set")?,
        };
        if config.admin_token.trim().is_empty() {
            anyhow::bail!("ADMIN_TOKEN must not be empty");
        }

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(4).collect();
            format!("{head}...({} chars)", val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", redact_url(&self.database_url));
        tracing::info!("  ADMIN_TOKEN: {}", preview(&self.admin_token));
    }
}

/// Strip the password out of a connection string before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let creds = &url[scheme_end + 3..at];
            let user = creds.split(':').next().unwrap_or_default();
            format!("{}{user}:***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// TOML-backed configuration loaded from disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigationConfig {
    /// Apply the shipped baseline at startup when the store is empty.
    #[serde(default)]
    pub seed_baseline_if_empty: bool,
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8080").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 10);
        assert!(!config.navigation.seed_baseline_if_empty);
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8080\nprot = 1").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn redacts_database_password() {
        assert_eq!(
            redact_url("postgres://nav:hunter2@db:5432/console"),
            "postgres://nav:***@db:5432/console"
        );
        assert_eq!(redact_url("postgres://localhost/console"), "postgres://localhost/console");
    }
}

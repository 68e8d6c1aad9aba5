//! Server configuration.
//!
//! Configuration is read from a TOML file. Missing sections fall back to
//! defaults, command line flags override the file afterwards.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/rmp/rmp.db"
//!
//! [reports]
//! output_dir = "/var/lib/rmp/reports"
//!
//! [[reports.schedule]]
//! kind = "bench"
//! format = "pdf"
//! at = "weekly:mon@08:00"
//!
//! [zoho]
//! portal_id = "12345"
//! client_id = "1000.XXXX"
//! client_secret = "..."
//! refresh_token = "..."
//! sync_interval = "6h"
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::report::schedule::Schedule;
use crate::report::{ReportFormat, ReportKind};

pub const DEFAULT_CONFIG_DIR: &str = ".rmp";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub reports: ReportsSection,
    pub zoho: Option<ZohoSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API from a browser. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: PathBuf::from("rmp.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportsSection {
    pub output_dir: PathBuf,
    pub schedule: Vec<ScheduledReport>,
}

impl Default for ReportsSection {
    fn default() -> Self {
        ReportsSection {
            output_dir: PathBuf::from("reports"),
            schedule: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledReport {
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub at: Schedule,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZohoSection {
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub portal_id: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub sync_interval: Option<Duration>,
}

fn default_accounts_url() -> String {
    "https://accounts.zoho.com".to_string()
}

fn default_api_url() -> String {
    "https://projectsapi.zoho.com".to_string()
}

fn deserialize_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };
    let duration = humantime::parse_duration(&value).map_err(serde::de::Error::custom)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom(format!(
            "duration '{value}' must not be zero"
        )));
    }
    Ok(Some(duration))
}

pub fn default_config_path() -> PathBuf {
    let mut home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    home.push(DEFAULT_CONFIG_DIR);
    home.push(CONFIG_FILE);
    home
}

impl Config {
    pub fn parse(content: &str) -> crate::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.apply_env();
        Ok(config)
    }

    /// Loads the configuration from `path`, or from the default location if it exists.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_config_path();
                if !path.exists() {
                    log::debug!("No configuration at {}, using defaults", path.display());
                    let mut config = Config::default();
                    config.apply_env();
                    return Ok(config);
                }
                path
            }
        };
        log::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            crate::common::error::RmpError::GenericError(format!(
                "Cannot read configuration {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    /// Secrets may be passed through the environment instead of the file.
    fn apply_env(&mut self) {
        if let Some(zoho) = self.zoho.as_mut() {
            if let Ok(secret) = std::env::var("RMP_ZOHO_CLIENT_SECRET") {
                zoho.client_secret = secret;
            }
            if let Ok(token) = std::env::var("RMP_ZOHO_REFRESH_TOKEN") {
                zoho.refresh_token = token;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;
    use crate::report::{ReportFormat, ReportKind};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path.to_str(), Some("rmp.db"));
        assert!(config.reports.schedule.is_empty());
        assert!(config.zoho.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
path = "/tmp/rmp.db"

[reports]
output_dir = "/tmp/reports"

[[reports.schedule]]
kind = "bench"
format = "pdf"
at = "weekly:mon@08:00"

[[reports.schedule]]
kind = "utilization"
format = "xlsx"
at = "daily@06:30"

[zoho]
portal_id = "1"
client_id = "id"
client_secret = "secret"
refresh_token = "token"
sync_interval = "6h"
"#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.reports.schedule.len(), 2);
        assert_eq!(config.reports.schedule[0].kind, ReportKind::Bench);
        assert_eq!(config.reports.schedule[1].format, ReportFormat::Xlsx);
        let zoho = config.zoho.unwrap();
        assert_eq!(zoho.sync_interval, Some(Duration::from_secs(6 * 3600)));
        assert_eq!(zoho.api_url, "https://projectsapi.zoho.com");
    }

    #[test]
    fn test_invalid_schedule_is_rejected() {
        let result = Config::parse(
            r#"
[[reports.schedule]]
kind = "bench"
format = "pdf"
at = "monthly"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_sync_interval_is_rejected() {
        let zoho = |interval: &str| {
            Config::parse(&format!(
                "[zoho]\nportal_id = \"1\"\nclient_id = \"id\"\nsync_interval = \"{interval}\""
            ))
        };
        let error = zoho("0s").unwrap_err().to_string();
        assert!(error.contains("duration '0s' must not be zero"), "{error}");
        assert!(zoho("0ms").is_err());
        assert!(zoho("soon").is_err());
        assert_eq!(
            zoho("15m").unwrap().zoho.unwrap().sync_interval,
            Some(Duration::from_secs(15 * 60))
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(Config::parse("[server]\nprot = 1").is_err());
    }
}

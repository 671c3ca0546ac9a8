use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Email of the bootstrap administrator account
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Password for the bootstrap administrator. Generated on first start when unset.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Lifetime of a login session in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: None,
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@airdesk.local".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

/// Outbound SMTP settings for confirmation emails
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_tls")]
    pub smtp_tls: bool,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    pub from_address: Option<String>,
}

impl EmailConfig {
    /// SMTP is usable once a host and a sender address are known
    pub fn is_configured(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|h| !h.is_empty())
            && self.from_address.as_deref().is_some_and(|a| !a.is_empty())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_tls: default_smtp_tls(),
            from_name: default_from_name(),
            from_address: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

fn default_from_name() -> String {
    "Airdesk".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Secrets may be supplied through the environment instead of the config file
    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var("AIRDESK_SMTP_PASSWORD") {
            self.email.smtp_password = Some(password);
        }
        if let Ok(password) = std::env::var("AIRDESK_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.session_ttl_days, 7);
        assert_eq!(config.email.smtp_port, 587);
        assert!(!config.email.is_configured());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_email_section_parses() {
        let config = Config::from_toml(
            r#"
            [email]
            smtp_host = "smtp.example.com"
            smtp_port = 2525
            from_name = "Skyways"
            from_address = "no-reply@example.com"
            "#,
        )
        .unwrap();

        assert!(config.email.is_configured());
        assert_eq!(config.email.smtp_port, 2525);
        assert_eq!(config.email.from_name, "Skyways");
        assert!(config.email.smtp_tls);
    }

    #[test]
    fn test_email_requires_sender_address() {
        let config = Config::from_toml(
            r#"
            [email]
            smtp_host = "smtp.example.com"
            "#,
        )
        .unwrap();
        assert!(!config.email.is_configured());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/airdesk.toml")).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.admin_email, "admin@airdesk.local");
    }
}

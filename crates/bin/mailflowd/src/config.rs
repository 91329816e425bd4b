//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `mailflow.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use mailflow_adapter_smtp_lettre::SmtpConfig;
use mailflow_app::services::queue_processor::ProcessorSettings;
use mailflow_domain::placeholder::Variables;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// API authentication.
    pub auth: AuthConfig,
    /// Queue processing.
    pub queue: QueueConfig,
    /// Outgoing mail server.
    pub smtp: SmtpSection,
    /// Global template variables (e.g. `shop_url`), available to every email.
    pub variables: Variables,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Bearer tokens accepted by the API. Empty leaves the API open.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<String>,
}

/// Queue processing configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Seconds between background runs; `0` leaves processing on demand.
    pub poll_interval_secs: u64,
    pub batch_size: usize,
    pub concurrency: usize,
    pub send_timeout_secs: u64,
    /// Seconds after which an item left in `processing` is failed.
    pub claim_lease_secs: u64,
}

/// SMTP relay configuration. When disabled, emails are only logged.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub starttls: bool,
}

impl Config {
    /// Load configuration from `mailflow.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("mailflow.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("MAILFLOW_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("MAILFLOW_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("MAILFLOW_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("MAILFLOW_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("MAILFLOW_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("MAILFLOW_API_TOKEN") {
            self.auth.tokens = vec![val];
        }
        if let Some(val) = var("MAILFLOW_SMTP_PASSWORD") {
            self.smtp.password = Some(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.queue.batch_size == 0 {
            return Err(ConfigError::Validation(
                "queue.batch_size must be non-zero".to_string(),
            ));
        }
        if self.queue.concurrency == 0 {
            return Err(ConfigError::Validation(
                "queue.concurrency must be non-zero".to_string(),
            ));
        }
        if self.queue.claim_lease_secs <= self.queue.send_timeout_secs {
            return Err(ConfigError::Validation(
                "queue.claim_lease_secs must exceed queue.send_timeout_secs".to_string(),
            ));
        }
        if self.smtp.enabled && self.smtp.from_email.trim().is_empty() {
            return Err(ConfigError::Validation(
                "smtp.from_email is required when smtp is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Interval of the background queue worker, `None` when disabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        let secs = self.queue.poll_interval_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    #[must_use]
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            batch_size: self.queue.batch_size,
            concurrency: self.queue.concurrency,
            send_timeout: Duration::from_secs(self.queue.send_timeout_secs),
            claim_lease: Duration::from_secs(self.queue.claim_lease_secs),
            globals: self.variables.clone(),
        }
    }

    #[must_use]
    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            host: self.smtp.host.clone(),
            port: self.smtp.port,
            username: self.smtp.username.clone(),
            password: self.smtp.password.clone(),
            from_email: self.smtp.from_email.clone(),
            from_name: self.smtp.from_name.clone(),
            starttls: self.smtp.starttls,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:mailflow.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "mailflowd=info,mailflow=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        let processor = ProcessorSettings::default();
        Self {
            poll_interval_secs: 0,
            batch_size: processor.batch_size,
            concurrency: processor.concurrency,
            send_timeout_secs: processor.send_timeout.as_secs(),
            claim_lease_secs: processor.claim_lease.as_secs(),
        }
    }
}

impl Default for SmtpSection {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_email: String::new(),
            from_name: None,
            starttls: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite:mailflow.db?mode=rwc");
        assert!(config.auth.tokens.is_empty());
        assert!(!config.smtp.enabled);
        assert!(config.poll_interval().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.queue.batch_size, 100);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'
            max_connections = 2

            [logging]
            filter = 'debug'

            [auth]
            tokens = ['one', 'two']

            [queue]
            poll_interval_secs = 60
            batch_size = 10
            concurrency = 2
            send_timeout_secs = 5
            claim_lease_secs = 120

            [smtp]
            enabled = true
            host = 'smtp.example.com'
            port = 2525
            username = 'mailer'
            from_email = 'shop@example.com'
            from_name = 'Example Shop'
            starttls = false

            [variables]
            shop_url = 'https://shop.example.com'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.auth.tokens, vec!["one", "two"]);
        assert_eq!(config.poll_interval(), Some(Duration::from_secs(60)));

        let settings = config.processor_settings();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.send_timeout, Duration::from_secs(5));
        assert_eq!(settings.claim_lease, Duration::from_secs(120));
        assert_eq!(settings.globals["shop_url"], "https://shop.example.com");

        let smtp = config.smtp_config();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert!(!smtp.starttls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_apply_environment_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("MAILFLOW_BIND", "127.0.0.1:8080"),
            ("MAILFLOW_DATABASE_URL", "sqlite::memory:"),
            ("MAILFLOW_API_TOKEN", "secret"),
            ("MAILFLOW_SMTP_PASSWORD", "hunter2"),
            ("RUST_LOG", "trace"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.tokens, vec!["secret"]);
        assert_eq!(config.smtp.password.as_deref(), Some("hunter2"));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("MAILFLOW_PORT", "http")]));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_batch_size_and_concurrency() {
        let mut config = Config::default();
        config.queue.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.queue.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_claim_lease_not_longer_than_send_timeout() {
        let mut config = Config::default();
        config.queue.send_timeout_secs = 30;
        config.queue.claim_lease_secs = 30;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.queue.claim_lease_secs = 31;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_require_sender_when_smtp_enabled() {
        let mut config = Config::default();
        config.smtp.enabled = true;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.smtp.from_email = "shop@example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}

//! Monitor configuration types

pub mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use loader::{file_path, load_config};

/// A single monitored log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedFile {
    /// Absolute path to the log file
    #[serde(rename = "file")]
    pub path: String,
    /// Polling interval in seconds
    pub delay: u64,
    /// Regular expression matched against each new line; empty matches all
    #[serde(default)]
    pub pattern: String,
    /// Match count considered the edge of normal activity
    #[serde(default)]
    pub boundary: u64,
    /// `true`: a rise above boundary is abnormal, `false` (default): a fall below it
    #[serde(default)]
    pub increase: bool,
    /// Alert recipients
    #[serde(default)]
    pub emails: Vec<String>,
    /// Escalation thresholds, strictly ascending and above `boundary`
    #[serde(default)]
    pub limits: Vec<u64>,
}

impl WatchedFile {
    pub fn new(path: impl Into<String>, delay: u64) -> Self {
        Self {
            path: path.into(),
            delay,
            pattern: String::new(),
            boundary: 0,
            increase: false,
            emails: Vec::new(),
            limits: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_boundary(mut self, boundary: u64) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_increase(mut self, increase: bool) -> Self {
        self.increase = increase;
        self
    }

    pub fn with_limits(mut self, limits: Vec<u64>) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Check the invariants the escalation engine relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::InvalidFile {
                path: self.path.clone(),
                reason: "empty file name".to_string(),
            });
        }

        if self.delay == 0 {
            return Err(ConfigError::InvalidFile {
                path: self.path.clone(),
                reason: "delay must be greater than zero".to_string(),
            });
        }

        if let Err(e) = Regex::new(&self.pattern) {
            return Err(ConfigError::InvalidFile {
                path: self.path.clone(),
                reason: format!("invalid pattern: {}", e),
            });
        }

        if let Some(first) = self.limits.first() {
            if *first <= self.boundary {
                return Err(ConfigError::InvalidFile {
                    path: self.path.clone(),
                    reason: format!(
                        "limit {} is not above boundary {}",
                        first, self.boundary
                    ),
                });
            }
        }

        if self.limits.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidFile {
                path: self.path.clone(),
                reason: format!("limits {:?} are not strictly ascending", self.limits),
            });
        }

        Ok(())
    }
}

impl fmt::Display for WatchedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File: {}; Delay: {}; Pattern: {}; Boundary: {}; Increase: {}; Emails: {:?}; Limits: {:?}",
            self.path, self.delay, self.pattern, self.boundary, self.increase, self.emails, self.limits
        )
    }
}

/// Named group of watched files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub files: Vec<WatchedFile>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: WatchedFile) -> Self {
        self.files.push(file);
        self
    }
}

/// SMTP credentials shared by every notification
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub host: String,
    /// `host:port` of the SMTP server
    #[serde(default)]
    pub addr: String,
}

impl Sender {
    /// Names of the fields that are missing or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("user", &self.user),
            ("password", &self.password),
            ("host", &self.host),
            ("addr", &self.addr),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// Keeps the password out of logs
impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("addr", &self.addr)
            .finish()
    }
}

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory used by the `file` backend
    pub data_dir: PathBuf,
    /// Count content already present in a file on its first poll
    pub replay_existing: bool,
    /// Maximum bytes consumed from one file per poll
    pub max_read_bytes: u64,
    /// Identical sends inside this window are suppressed (0 disables)
    pub dedup_window_secs: u64,
    /// Base delay before retrying a transient delivery failure
    pub retry_backoff_ms: u64,
    /// Also notify when the tier drops without reaching 0
    pub notify_on_deescalation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./logchecker_data"),
            replay_existing: false,
            max_read_bytes: 8 * 1024 * 1024,
            dedup_window_secs: 60,
            retry_backoff_ms: 500,
            notify_on_deescalation: false,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File this configuration was loaded from
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub observed: Vec<Service>,
    /// State backend name; required
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Every watched file paired with the name of its service
    pub fn files(&self) -> impl Iterator<Item = (&str, &WatchedFile)> {
        self.observed
            .iter()
            .flat_map(|s| s.files.iter().map(move |f| (s.name.as_str(), f)))
    }

    /// Total number of watched files
    pub fn file_count(&self) -> usize {
        self.observed.iter().map(|s| s.files.len()).sum()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config: {}", self.path.display())?;
        writeln!(
            f,
            " sender: user={} host={} addr={}",
            self.sender.user, self.sender.host, self.sender.addr
        )?;
        write!(f, " storage: {}", self.storage)?;
        for service in &self.observed {
            write!(f, "\n---\n{}", service.name)?;
            for file in &service.files {
                write!(f, "\n\t{}", file)?;
            }
        }
        Ok(())
    }
}

/// Configuration errors; all of them are fatal at start-up
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Empty file name")]
    EmptyPath,

    #[error("Can't access '{path}': {source}")]
    Inaccessible {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Can't parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Service name is empty")]
    EmptyServiceName,

    #[error("Service '{0}' is already registered")]
    DuplicateService(String),

    #[error("Service '{0}' has no files")]
    EmptyService(String),

    #[error("No services configured")]
    NoServices,

    #[error("Invalid file '{path}': {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("File '{0}' is watched more than once")]
    DuplicateFile(String),

    #[error("Configuration has not been validated")]
    NotValidated,

    #[error("Sender fields missing: {0}")]
    MissingSender(String),

    #[error("No storage backend configured")]
    MissingStorage,

    #[error("Unknown storage backend '{name}' (available: {available})")]
    UnknownBackend { name: String, available: String },

    #[error("Storage backend failed to start: {0}")]
    Backend(#[from] crate::storage::StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watched_file_builder() {
        let file = WatchedFile::new("/var/log/nginx/error.log", 30)
            .with_pattern("error")
            .with_boundary(5)
            .with_limits(vec![10, 20])
            .with_email("ops@example.com");

        assert_eq!(file.interval(), Duration::from_secs(30));
        assert!(!file.increase);
        assert!(file.validate().is_ok());
        assert!(file.with_increase(true).increase);
    }

    #[test]
    fn test_increase_default_matches_json() {
        let parsed: WatchedFile =
            serde_json::from_str(r#"{"file": "/var/log/syslog", "delay": 10}"#).unwrap();
        assert_eq!(parsed, WatchedFile::new("/var/log/syslog", 10));
    }

    #[test]
    fn test_zero_delay_rejected() {
        let file = WatchedFile::new("/var/log/syslog", 0);
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidFile { .. })
        ));
    }

    #[test]
    fn test_unsorted_limits_rejected() {
        let file = WatchedFile::new("/var/log/syslog", 10)
            .with_boundary(5)
            .with_limits(vec![20, 10]);
        assert!(file.validate().is_err());

        let file = WatchedFile::new("/var/log/syslog", 10)
            .with_boundary(5)
            .with_limits(vec![10, 10]);
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_limit_not_above_boundary_rejected() {
        let file = WatchedFile::new("/var/log/syslog", 10)
            .with_boundary(10)
            .with_limits(vec![10, 20]);
        let err = file.validate().unwrap_err().to_string();
        assert!(err.contains("not above boundary"), "got: {err}");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let file = WatchedFile::new("/var/log/syslog", 10).with_pattern("(unclosed");
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_sender_missing_fields() {
        let sender = Sender {
            user: "user@host.com".to_string(),
            password: "password".to_string(),
            host: "smtp.host.com".to_string(),
            addr: " ".to_string(),
        };
        assert_eq!(sender.missing_fields(), vec!["addr"]);
        let debug = format!("{:?}", sender);
        assert!(debug.contains("***"));
        assert!(!debug.contains("\"password\""));
    }

    #[test]
    fn test_parse_json_format() {
        let json = r#"{
            "sender": {"user": "user@host.com", "password": "secret", "host": "smtp.host.com", "addr": "smtp.host.com:25"},
            "observed": [
                {"name": "nginx", "files": [
                    {"file": "/var/log/nginx/error.log", "delay": 30, "pattern": "error",
                     "boundary": 5, "increase": true, "emails": ["ops@host.com"], "limits": [10, 20]}
                ]}
            ]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.storage.is_empty());
        assert_eq!(config.file_count(), 1);
        assert_eq!(config.settings, Settings::default());

        let (service, file) = config.files().next().unwrap();
        assert_eq!(service, "nginx");
        assert_eq!(file.path, "/var/log/nginx/error.log");
        assert_eq!(file.limits, vec![10, 20]);
    }

    #[test]
    fn test_display_hides_password() {
        let mut config = Config::default();
        config.sender.password = "hunter2".to_string();
        config.observed.push(
            Service::new("web").with_file(WatchedFile::new("/var/log/nginx/access.log", 60)),
        );

        let rendered = config.to_string();
        assert!(rendered.contains("web"));
        assert!(rendered.contains("File: /var/log/nginx/access.log; Delay: 60"));
        assert!(!rendered.contains("hunter2"));
    }
}

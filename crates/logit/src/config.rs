use crate::{
    encoder::{EncoderStyle, DEFAULT_TIME_FORMAT},
    error::ConfigError,
    level::Level,
};
use chrono::format::{Item, StrftimeItems};
use serde_with::DisplayFromStr;
use size::Size;
use std::{path::Path, path::PathBuf, time::Duration};
use url::Url;

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Everything needed to build a [`Logger`](crate::Logger).
pub struct LoggerConfig {
    /// strftime-style layout of the `time` field
    pub time_format: String,
    /// Line format for console and file output. Console when running locally,
    /// JSON anywhere else, unless set.
    pub encoder: Option<EncoderStyle>,
    /// Attach a `stacktrace` field to error and fatal entries
    pub capture_backtrace: bool,
    pub app: AppConfig,
    pub console: ConsoleConfig,
    pub file: FileConfig,
    pub escalation: EscalationConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            time_format: String::from(DEFAULT_TIME_FORMAT),
            encoder: None,
            capture_backtrace: false,
            app: Default::default(),
            console: Default::default(),
            file: Default::default(),
            escalation: Default::default(),
        }
    }
}

impl LoggerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::MissingAppName);
        }

        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidTimeFormat(self.time_format.clone()));
        }

        if self.file.enabled {
            self.file.validate()?;
        }

        if self.escalation.enabled && self.escalation.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }

        Ok(())
    }

    pub fn encoder_style(&self) -> EncoderStyle {
        match self.encoder {
            Some(style) => style,
            None if self.app.environment.is_local() => EncoderStyle::Console,
            None => EncoderStyle::Json,
        }
    }

    /// Whether entries should reach the crash-reporting service at all.
    pub fn escalation_active(&self) -> bool {
        self.escalation.enabled && !(self.escalation.suppress_in_local && self.app.environment.is_local())
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Tags every entry as `appName` and prefixes log file names
    pub name: String,
    /// Tags every entry as `appVersion`
    pub version: String,
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::from("0.0.0"),
            environment: Environment::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    #[serde(alias = "dev")]
    Development,
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub level: Level,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::Info,
        }
    }
}

#[serde_with::serde_as]
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub enabled: bool,
    pub level: Level,
    /// Directory holding the active file and its backups
    pub dir: PathBuf,
    /// Rotate before the active file would grow beyond this
    #[serde_as(as = "DisplayFromStr")]
    pub max_size: Size,
    /// Backups to keep. Unlimited when not set.
    pub max_backups: Option<usize>,
    /// Delete backups older than this. Never when not set.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub max_age: Option<Duration>,
    /// Rotate once the active file is this old
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub rotation_interval: Duration,
    /// Gzip backups after rotation
    pub compress: bool,
}

impl FileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidPath {
                path: self.dir.clone(),
                reason: String::from("the directory must not be empty"),
            });
        }

        if self.dir.exists() && !self.dir.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: self.dir.clone(),
                reason: String::from("not a directory"),
            });
        }

        if self.max_size.bytes() <= 0 {
            return Err(ConfigError::InvalidMaxSize);
        }

        if self.rotation_interval.is_zero() {
            return Err(ConfigError::InvalidRotationInterval);
        }

        Ok(())
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::Info,
            dir: PathBuf::from("logs"),
            max_size: Size::from_mebibytes(100),
            max_backups: None,
            max_age: None,
            rotation_interval: Duration::from_secs(24 * 60 * 60),
            compress: false,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    pub enabled: bool,
    /// Entries at or above this level are reported
    pub level: Level,
    /// Do not report anything while running locally
    pub suppress_in_local: bool,
    /// Reports waiting for delivery before new ones get dropped
    pub queue_capacity: usize,
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub flush_timeout: Duration,
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub request_timeout: Duration,
    pub endpoint: Option<Url>,
    /// Project key sent along with every report
    pub key: Option<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::Error,
            suppress_in_local: true,
            queue_capacity: 1024,
            flush_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
            endpoint: None,
            key: None,
        }
    }
}

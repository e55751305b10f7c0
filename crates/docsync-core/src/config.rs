//! Configuration module for docsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for docsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub schedule: ScheduleConfig,
    pub audit: AuditConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Reconciliation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// When `false`, deleting a counterpart only excludes it from future sync.
    pub delete_physically: bool,
    /// Default policy for two-sided edits: `prefer_local`, `prefer_remote`, `neither` or `ask`.
    pub conflict_policy: String,
    /// Per-path overrides of `conflict_policy`; the first matching pattern wins.
    pub conflict_rules: Vec<ConflictRuleConfig>,
    /// File extensions (without the dot) that are never uploaded.
    pub forbidden_extensions: Vec<String>,
}

/// A glob pattern mapped to a conflict policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRuleConfig {
    /// Glob matched against the path relative to the link root, e.g. `**/*.docx`.
    pub pattern: String,
    pub policy: String,
}

/// Periodic run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// `interval` or `daily`.
    pub mode: String,
    /// Seconds between the end of one run and the start of the next (`interval` mode).
    pub interval_secs: u64,
    /// Local time of day as `HH:MM` (`daily` mode).
    pub daily_at: String,
}

/// Audit log persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory holding one file per calendar day.
    pub directory: PathBuf,
    /// Day files older than this are deleted after each run; `0` keeps everything.
    pub retention_days: u32,
}

/// Link store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docsync")
            .join("config.yaml")
    }

    /// Writes the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("docsync")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_physically: false,
            conflict_policy: "ask".to_string(),
            conflict_rules: Vec::new(),
            forbidden_extensions: vec!["exe".to_string(), "bat".to_string(), "dll".to_string()],
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: "interval".to_string(),
            interval_secs: 3600,
            daily_at: "02:00".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: data_dir().join("audit"),
            retention_days: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("links.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"schedule.daily_at"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Valid values for `sync.conflict_policy` and rule policies.
pub const VALID_CONFLICT_POLICIES: &[&str] = &["prefer_local", "prefer_remote", "neither", "ask"];

/// Valid values for `schedule.mode`.
const VALID_SCHEDULE_MODES: &[&str] = &["interval", "daily"];

/// Parses an `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- sync ---
        if !VALID_CONFLICT_POLICIES.contains(&self.sync.conflict_policy.as_str()) {
            push(
                "sync.conflict_policy",
                format!(
                    "must be one of {:?}, got '{}'",
                    VALID_CONFLICT_POLICIES, self.sync.conflict_policy
                ),
            );
        }
        for (i, rule) in self.sync.conflict_rules.iter().enumerate() {
            if rule.pattern.trim().is_empty() {
                push(
                    &format!("sync.conflict_rules[{i}].pattern"),
                    "must not be empty".into(),
                );
            }
            if !VALID_CONFLICT_POLICIES.contains(&rule.policy.as_str()) {
                push(
                    &format!("sync.conflict_rules[{i}].policy"),
                    format!("must be one of {:?}, got '{}'", VALID_CONFLICT_POLICIES, rule.policy),
                );
            }
        }
        for ext in &self.sync.forbidden_extensions {
            if ext.is_empty() || ext.starts_with('.') {
                push(
                    "sync.forbidden_extensions",
                    format!("'{ext}' must be a bare extension without the dot"),
                );
            }
        }

        // --- schedule ---
        if !VALID_SCHEDULE_MODES.contains(&self.schedule.mode.as_str()) {
            push(
                "schedule.mode",
                format!("must be one of {:?}, got '{}'", VALID_SCHEDULE_MODES, self.schedule.mode),
            );
        }
        if self.schedule.mode == "interval" && self.schedule.interval_secs == 0 {
            push("schedule.interval_secs", "must be greater than 0".into());
        }
        if self.schedule.mode == "daily" && parse_time_of_day(&self.schedule.daily_at).is_none() {
            push(
                "schedule.daily_at",
                format!("must be HH:MM, got '{}'", self.schedule.daily_at),
            );
        }

        // --- audit ---
        if self.audit.directory.as_os_str().is_empty() {
            push("audit.directory", "must not be empty".into());
        }

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            push("storage.database_path", "must not be empty".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!("must be one of {:?}, got '{}'", VALID_LOG_LEVELS, self.logging.level),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format",
                format!("must be one of {:?}, got '{}'", VALID_LOG_FORMATS, self.logging.format),
            );
        }

        errors
    }

    /// True when `sync.forbidden_extensions` matches `file_name`
    pub fn is_forbidden(&self, file_name: &str) -> bool {
        has_forbidden_extension(&self.sync.forbidden_extensions, file_name)
    }
}

/// True when the extension of `file_name` (after the last dot) is one of
/// `extensions`, ignoring ASCII case. Names without a dot never match.
pub fn has_forbidden_extension(extensions: &[String], file_name: &str) -> bool {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    extensions.iter().any(|f| f.eq_ignore_ascii_case(ext))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from the defaults.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder pre-filled with [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn delete_physically(mut self, enabled: bool) -> Self {
        self.config.sync.delete_physically = enabled;
        self
    }

    pub fn conflict_policy(mut self, policy: impl Into<String>) -> Self {
        self.config.sync.conflict_policy = policy.into();
        self
    }

    pub fn conflict_rule(mut self, pattern: impl Into<String>, policy: impl Into<String>) -> Self {
        self.config.sync.conflict_rules.push(ConflictRuleConfig {
            pattern: pattern.into(),
            policy: policy.into(),
        });
        self
    }

    pub fn forbidden_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.sync.forbidden_extensions = extensions;
        self
    }

    // --- schedule ---

    pub fn schedule_interval(mut self, seconds: u64) -> Self {
        self.config.schedule.enabled = true;
        self.config.schedule.mode = "interval".to_string();
        self.config.schedule.interval_secs = seconds;
        self
    }

    pub fn schedule_daily(mut self, at: impl Into<String>) -> Self {
        self.config.schedule.enabled = true;
        self.config.schedule.mode = "daily".to_string();
        self.config.schedule.daily_at = at.into();
        self
    }

    // --- audit ---

    pub fn audit_directory(mut self, directory: PathBuf) -> Self {
        self.config.audit.directory = directory;
        self
    }

    pub fn audit_retention_days(mut self, days: u32) -> Self {
        self.config.audit.retention_days = days;
        self
    }

    // --- storage ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Config command - View and manage docsync configuration
//!
//! Provides the `docsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use docsync_core::config::{Config, ConflictRuleConfig};
use tracing::info;

use super::CommandContext;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.delete_physically", "true|false"),
    ("sync.conflict_policy", "prefer_local|prefer_remote|neither|ask"),
    ("sync.conflict_rules", "pattern=policy[,pattern=policy...] (empty clears)"),
    ("sync.forbidden_extensions", "comma-separated extensions without the dot"),
    ("schedule.enabled", "true|false"),
    ("schedule.mode", "interval|daily"),
    ("schedule.interval_secs", "seconds between runs"),
    ("schedule.daily_at", "HH:MM local time"),
    ("audit.directory", "directory for daily audit files"),
    ("audit.retention_days", "days to keep audit files (0 keeps all)"),
    ("storage.database_path", "link database file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "pretty|json"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "schedule.interval_secs")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.format.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&ctx.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CommandContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let mut config = ctx.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<28} - {help}"));
                }
            }
            return Ok(());
        }

        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            return Ok(());
        }

        config
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        // Load the file explicitly; the context holds defaults when it is unreadable
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {e}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info(
                        "Using default configuration. Run 'docsync config set <key> <value>' to create one.",
                    );
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if ctx.format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false for {key}"),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// See [`SUPPORTED_KEYS`] for the accepted keys.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.delete_physically" => {
            config.sync.delete_physically = parse_bool(key, value)?;
        }
        "sync.conflict_policy" => {
            config.sync.conflict_policy = value.trim().to_string();
        }
        "sync.conflict_rules" => {
            config.sync.conflict_rules = parse_list(value)
                .into_iter()
                .map(|entry| {
                    let (pattern, policy) = entry
                        .split_once('=')
                        .with_context(|| format!("Expected pattern=policy, got '{entry}'"))?;
                    Ok(ConflictRuleConfig {
                        pattern: pattern.trim().to_string(),
                        policy: policy.trim().to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
        }
        "sync.forbidden_extensions" => {
            config.sync.forbidden_extensions = parse_list(value)
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect();
        }

        // --- schedule ---
        "schedule.enabled" => {
            config.schedule.enabled = parse_bool(key, value)?;
        }
        "schedule.mode" => {
            config.schedule.mode = value.trim().to_string();
        }
        "schedule.interval_secs" => {
            config.schedule.interval_secs = value
                .trim()
                .parse::<u64>()
                .context("Expected a positive integer for schedule.interval_secs")?;
        }
        "schedule.daily_at" => {
            config.schedule.daily_at = value.trim().to_string();
        }

        // --- audit ---
        "audit.directory" => {
            config.audit.directory = PathBuf::from(value);
        }
        "audit.retention_days" => {
            config.audit.retention_days = value
                .trim()
                .parse::<u32>()
                .context("Expected a non-negative integer for audit.retention_days")?;
        }

        // --- storage ---
        "storage.database_path" => {
            config.storage.database_path = PathBuf::from(value);
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.trim().to_lowercase();
        }
        "logging.format" => {
            config.logging.format = value.trim().to_lowercase();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_apply_delete_physically() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.delete_physically", "yes").unwrap();
        assert!(config.sync.delete_physically);
        assert!(apply_config_value(&mut config, "sync.delete_physically", "maybe").is_err());
    }

    #[test]
    fn test_apply_forbidden_extensions_strips_dots() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.forbidden_extensions", ".EXE, msi,,sh").unwrap();
        assert_eq!(config.sync.forbidden_extensions, vec!["exe", "msi", "sh"]);
        assert!(config.is_forbidden("setup.MSI"));
    }

    #[test]
    fn test_apply_conflict_rules() {
        let mut config = Config::default();
        apply_config_value(
            &mut config,
            "sync.conflict_rules",
            "**/*.docx=prefer_remote, notes/**=prefer_local",
        )
        .unwrap();
        assert_eq!(config.sync.conflict_rules.len(), 2);
        assert_eq!(config.sync.conflict_rules[0].pattern, "**/*.docx");
        assert_eq!(config.sync.conflict_rules[1].policy, "prefer_local");

        apply_config_value(&mut config, "sync.conflict_rules", "").unwrap();
        assert!(config.sync.conflict_rules.is_empty());

        assert!(apply_config_value(&mut config, "sync.conflict_rules", "no-policy").is_err());
    }

    #[test]
    fn test_apply_schedule_values() {
        let mut config = Config::default();
        apply_config_value(&mut config, "schedule.mode", "daily").unwrap();
        apply_config_value(&mut config, "schedule.daily_at", "03:30").unwrap();
        apply_config_value(&mut config, "schedule.interval_secs", "600").unwrap();
        assert_eq!(config.schedule.mode, "daily");
        assert_eq!(config.schedule.daily_at, "03:30");
        assert_eq!(config.schedule.interval_secs, 600);
        assert!(config.validate().is_empty());

        assert!(apply_config_value(&mut config, "schedule.interval_secs", "-5").is_err());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.conflict_policy", "coin_flip").unwrap();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sync.conflict_policy");
    }

    #[test]
    fn test_apply_unknown_key() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.root", "/x").is_err());
    }

    #[test]
    fn test_every_supported_key_is_accepted() {
        let sample = |key: &str| match key {
            "sync.delete_physically" | "schedule.enabled" => "false",
            "schedule.interval_secs" | "audit.retention_days" => "10",
            "sync.conflict_rules" => "*.txt=ask",
            _ => "x",
        };
        for (key, _) in SUPPORTED_KEYS {
            let mut config = Config::default();
            assert!(
                apply_config_value(&mut config, key, sample(key)).is_ok(),
                "{key} rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_set_writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let ctx = CommandContext::new(path.clone(), Config::default(), OutputFormat::Json);

        ConfigCommand::Set {
            key: "audit.retention_days".to_string(),
            value: "7".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.audit.retention_days, 7);
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_value_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let ctx = CommandContext::new(path.clone(), Config::default(), OutputFormat::Json);

        ConfigCommand::Set {
            key: "logging.format".to_string(),
            value: "xml".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        assert!(!path.exists());
    }
}

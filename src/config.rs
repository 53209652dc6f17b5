/// Configuration management for patchx
///
/// patchx stores configuration in ~/.patchx/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// patchx configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Behavior settings
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Custom backup directory
    #[serde(default)]
    pub backup_dir: Option<String>,

    /// Maximum number of backups to keep
    #[serde(default = "default_max_backups")]
    pub max_backups: Option<usize>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            max_backups: Some(50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of context lines to show around changes
    #[serde(default = "default_context_lines")]
    pub context_lines: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            context_lines: Some(2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Treat unmatched patterns and absent blocks as fatal errors
    #[serde(default = "default_strict")]
    pub strict: Option<bool>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            strict: Some(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable debug logging to file
    #[serde(default = "default_debug")]
    pub debug: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: Some(false),
        }
    }
}

// Default functions for serde
fn default_max_backups() -> Option<usize> { Some(50) }
fn default_context_lines() -> Option<usize> { Some(2) }
fn default_strict() -> Option<bool> { Some(false) }
fn default_debug() -> Option<bool> { Some(false) }

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".patchx");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# patchx Configuration File
#
# This file controls default behavior for patchx. Values set here can be
# overridden by command-line flags.
#
# For more information, run: patchx config --help

[backup]
# Custom backup directory (optional)
# Uncomment to use a custom backup location instead of ~/.patchx/backups/
#backup_dir = "/mnt/backups/patchx"

# Maximum number of backups to keep (default: 50)
# Older backups are pruned automatically after each run.
max_backups = 50

[output]
# Number of context lines to show around changes (default: 2, max: 10)
context_lines = 2

[behavior]
# Treat unmatched patterns and absent blocks as fatal errors (default: false)
# When false, a rule that matches nothing is reported as a no-op but the run
# continues. Enable this to catch patch scripts that drifted from their target.
strict = false

[logging]
# Enable debug logging to file (default: false)
# Logs go to /var/log/patchx.log if writable, otherwise ~/.patchx/patchx.log
debug = false
"#
}

/// Save the default commented configuration file
pub fn save_default_config() -> Result<()> {
    let config_path = config_file_path()?;

    fs::write(&config_path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", config_path.display()))?;

    Ok(())
}

/// Load configuration from file, creating default if needed
///
/// If the config file doesn't exist, creates it with defaults and returns them.
/// If the config file is malformed, recreates it with defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_file_path()?;

    if !config_path.exists() {
        save_default_config()?;
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(_) => {
            // Config is malformed, recreate with defaults
            save_default_config()?;
            return Ok(Config::default());
        }
    };

    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &Config) -> Result<()> {
    let config_path = config_file_path()?;

    let config_str = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;

    fs::write(&config_path, config_str)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    Ok(())
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(context) = config.output.context_lines {
        if context > 10 {
            anyhow::bail!("Invalid context_lines: {} (max 10)", context);
        }
    }

    if let Some(max) = config.backup.max_backups {
        if max == 0 {
            anyhow::bail!("Invalid max_backups: 0 (must keep at least 1)");
        }
    }

    Ok(())
}

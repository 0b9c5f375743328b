//! Daemon configuration.
//!
//! Loaded from `~/.mira/config.toml`; the default document ships embedded
//! and is written out on first start. Every field carries a serde default so
//! files from older builds keep loading.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `adb connect` target for wireless setups.
    #[serde(default = "default_adb_host")]
    pub adb_host: String,
    /// Upper bound for one adb invocation.
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Nominal delay between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Delay after a failed cycle.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_speak_timeout")]
    pub speak_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Periodic flush cadence for the memory store.
    #[serde(default = "default_backup_interval")]
    pub backup_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Delay between self-improvement passes.
    #[serde(default = "default_evolution_interval")]
    pub interval_secs: u64,
    /// Extra delay after a failed pass.
    #[serde(default = "default_evolution_backoff")]
    pub error_backoff_secs: u64,
}

fn default_adb_host() -> String {
    "localhost:5555".to_string()
}

fn default_shell_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2
}

fn default_error_backoff() -> u64 {
    5
}

fn default_enabled() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_rate() -> f32 {
    1.0
}

fn default_speak_timeout() -> u64 {
    10
}

fn default_backup_interval() -> u64 {
    300
}

fn default_evolution_interval() -> u64 {
    3600
}

fn default_evolution_backoff() -> u64 {
    300
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_host: default_adb_host(),
            shell_timeout_secs: default_shell_timeout(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            language: default_language(),
            rate: default_rate(),
            speak_timeout_secs: default_speak_timeout(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backup_interval_secs: default_backup_interval(),
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_evolution_interval(),
            error_backoff_secs: default_evolution_backoff(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            monitor: MonitorConfig::default(),
            voice: VoiceConfig::default(),
            memory: MemoryConfig::default(),
            evolution: EvolutionConfig::default(),
        }
    }
}

impl DeviceConfig {
    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl VoiceConfig {
    pub fn speak_timeout(&self) -> Duration {
        Duration::from_secs(self.speak_timeout_secs)
    }
}

impl MemoryConfig {
    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }
}

impl EvolutionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// Load the configuration from the default location, writing the embedded
/// default document on first start.
pub fn load() -> Result<Config> {
    load_from(&mira_common::paths::config_file())
}

pub fn load_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    } else {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }
        fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("write default config {}", path.display()))?;
        info!("wrote default config to {}", path.display());
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn embedded_default_document_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 2);
        assert_eq!(config.monitor.error_backoff_secs, 5);
        assert_eq!(config.memory.backup_interval_secs, 300);
        assert_eq!(config.evolution.interval_secs, 3600);
        assert_eq!(config.device.adb_host, "localhost:5555");
    }

    #[test]
    fn empty_document_falls_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert!(config.voice.enabled);
        assert!(config.evolution.enabled);
    }

    #[test]
    fn partial_section_keeps_sibling_defaults() {
        let config: Config = toml::from_str("[monitor]\npoll_interval_secs = 7\n").unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 7);
        assert_eq!(config.monitor.error_backoff_secs, 5);
        assert_eq!(config.voice.language, "en");
    }

    #[test]
    fn first_load_writes_the_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.device.shell_timeout(), Duration::from_secs(10));

        // second load reads the file it just wrote
        let reloaded = load_from(&path).unwrap();
        assert_eq!(reloaded.monitor.poll_interval_secs, config.monitor.poll_interval_secs);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "monitor = \"not a table\"").unwrap();
        assert!(load_from(&path).is_err());
    }
}

//! # Configuration Management Module
//!
//! Petcare reads a single TOML file. Every section and every field has a
//! default, so an empty file (or a partial one) is a valid configuration.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where the sled database lives
//! - [`LoggingConfig`] - log level and optional log file
//! - [`EngineConfig`] - decay ranges, random event chance, adventure rules
//! - [`EconomyConfig`] - daily claim, allowance and freeze pricing
//! - [`MortalityPolicy`] - whether exhaustion is lethal
//! - [`ScheduleConfig`] - sweep intervals
//! - [`WeatherConfig`] - rotation period
//! - [`InteractionConfig`] - reaction cooldown and prompt timeout
//!
//! ## Usage
//!
//! ```rust,no_run
//! use petcare::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("data dir: {}", config.storage.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "petcare.log"
//!
//! [economy]
//! daily_claim_coins = 10
//! freeze_cost_per_day = 1
//!
//! [mortality]
//! exhaustion_lethal = false
//!
//! [schedule]
//! decay_interval_secs = 3600
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::pet::economy::EconomyConfig;
use crate::pet::engine::EngineConfig;
use crate::pet::mortality::MortalityPolicy;
use crate::pet::scheduler::ScheduleConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fixed RNG seed for reproducible runs. Random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub mortality: MortalityPolicy,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Directory holding the sled pet database.
    pub fn pets_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("pets")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("petcare.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Hours between weather changes, measured from the last change.
    #[serde(default = "default_rotation_hours")]
    pub rotation_hours: u32,
}

fn default_rotation_hours() -> u32 {
    24
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            rotation_hours: default_rotation_hours(),
        }
    }
}

impl WeatherConfig {
    pub fn rotation_period(&self) -> chrono::Duration {
        chrono::Duration::hours(self.rotation_hours as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_reaction_cooldown_secs")]
    pub reaction_cooldown_secs: u32,
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u32,
}

fn default_reaction_cooldown_secs() -> u32 {
    10
}

fn default_prompt_timeout_secs() -> u32 {
    60
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            reaction_cooldown_secs: default_reaction_cooldown_secs(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
        }
    }
}

impl InteractionConfig {
    pub fn reaction_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reaction_cooldown_secs as i64)
    }

    pub fn prompt_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.prompt_timeout_secs as u64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rng_seed: None,
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
            economy: EconomyConfig::default(),
            mortality: MortalityPolicy::default(),
            schedule: ScheduleConfig::default(),
            weather: WeatherConfig::default(),
            interaction: InteractionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would make the engine or scheduler misbehave.
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .map_err(|e| anyhow!("[engine] {}", e))?;
        self.schedule
            .validate()
            .map_err(|e| anyhow!("[schedule] {}", e))?;
        if self.economy.max_freeze_days == 0 {
            return Err(anyhow!("[economy] max_freeze_days must be at least 1"));
        }
        if self.economy.claim_cooldown_hours <= 0 {
            return Err(anyhow!("[economy] claim_cooldown_hours must be positive"));
        }
        if self.weather.rotation_hours == 0 {
            return Err(anyhow!("[weather] rotation_hours must be at least 1"));
        }
        if self.interaction.prompt_timeout_secs == 0 {
            return Err(anyhow!("[interaction] prompt_timeout_secs must be at least 1"));
        }
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(anyhow!(
                "[logging] unknown level '{}'",
                self.logging.level
            ));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("[storage] data_dir cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").expect("parse");
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.economy.daily_claim_coins, 10);
        assert_eq!(config.economy.freeze_cost_per_day, 1);
        assert!(!config.mortality.exhaustion_lethal);
        assert_eq!(config.interaction.reaction_cooldown_secs, 10);
        assert_eq!(config.interaction.prompt_timeout_secs, 60);
        assert_eq!(config.weather.rotation_hours, 24);
        assert!((config.engine.random_event_chance - 0.20).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
rng_seed = 7

[mortality]
exhaustion_lethal = true

[schedule]
decay_interval_secs = 60
"#;
        let config: Config = toml::from_str(text).expect("parse");
        assert_eq!(config.rng_seed, Some(7));
        assert!(config.mortality.exhaustion_lethal);
        assert_eq!(config.schedule.decay_interval_secs, 60);
        assert_eq!(config.schedule.allowance_interval_secs, 86_400);
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut config = Config::default();
        config.engine.random_event_chance = 2.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.decay_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "chatty".into();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn create_default_then_load() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("utf8 path");
        Config::create_default(path).await.expect("write");
        let loaded = Config::load(path).await.expect("load");
        assert_eq!(loaded.storage.data_dir, "./data");
        assert_eq!(loaded.logging.file.as_deref(), Some("petcare.log"));
        assert_eq!(loaded.engine.hunger_decay, EngineConfig::default().hunger_decay);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("absent.toml");
        assert!(Config::load(path.to_str().expect("utf8")).await.is_err());
    }
}

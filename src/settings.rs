//! Configuration loading
//!
//! Layers embedded defaults, optional config files, and `TEMPOFLOW_*`
//! environment variables into one [`AppConfig`].

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tempoflow_browser::FarmConfig;
use tempoflow_core::AutomationConfig;
use tempoflow_sheets::SheetsConfig;

/// Embedded default configuration (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Batch-runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Concurrent profiles when no CLI override is given
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Seconds between profile launches in sequential mode
    #[serde(default = "default_profile_delay_secs")]
    pub profile_delay_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            profile_delay_secs: default_profile_delay_secs(),
        }
    }
}

fn default_max_parallel() -> usize {
    1
}

fn default_profile_delay_secs() -> u64 {
    5
}

/// Full application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine tunables
    #[serde(default)]
    pub automation: AutomationConfig,
    /// Browser-farm API settings
    #[serde(default)]
    pub farm: FarmConfig,
    /// Status-store settings
    #[serde(default)]
    pub sheets: SheetsConfig,
    /// Batch-runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Load configuration from embedded defaults, files, and environment.
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") ensures TEMPOFLOW_SHEETS__X works (single _
        // after prefix); the default would require TEMPOFLOW__SHEETS__X.
        .add_source(
            Environment::with_prefix("TEMPOFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.runner.max_parallel, 1);
        assert!(app.automation.faucet_url.starts_with("https://"));
        assert!(app.farm.api_url.contains("50325"));
    }

    #[test]
    fn test_runner_defaults() {
        let runner = RunnerConfig::default();
        assert_eq!(runner.max_parallel, 1);
        assert_eq!(runner.profile_delay_secs, 5);
    }
}

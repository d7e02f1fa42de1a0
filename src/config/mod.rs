//! Configuration for the AML screening service.
//!
//! Configuration is loaded in three layers: compiled-in defaults, an optional
//! per-environment TOML file, and `AMLSCREEN_*` environment variable
//! overrides. Every loaded configuration passes `validate()` before use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub screening: ScreeningConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
}

/// Screening engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Deadline for the entire screening call
    pub max_screening_latency: Duration,
    /// Number of concurrent check tasks. Informational: the engine always
    /// launches the five checks it knows about.
    pub parallel_checks: usize,
    /// Minimum similarity for fuzzy candidate acceptance
    pub fuzzy_match_threshold: f64,
    /// How often the sanctions index is refreshed from the cache
    pub ofac_update_interval: Duration,
    /// How often the PEP index is refreshed from the cache
    pub pep_update_interval: Duration,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            max_screening_latency: Duration::from_millis(200),
            parallel_checks: 5,
            fuzzy_match_threshold: 0.85,
            ofac_update_interval: Duration::from_secs(24 * 3600),
            pep_update_interval: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Pattern detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    /// Rolling window for structuring detection
    pub structuring_window_hours: u64,
    /// Reporting threshold amounts cluster just below
    pub structuring_threshold: f64,
    /// Minimum sub-threshold transactions in the window
    pub structuring_min_tx_count: usize,
    /// Window for inbound-then-outbound cycling
    pub rapid_cycling_window_mins: u64,
    /// Minimum out/in value ratio to flag cycling
    pub rapid_cycling_threshold: f64,
    /// Days of history behind the velocity baselines
    pub velocity_baseline_days: u32,
    /// Multiple of the daily baseline that counts as a spike
    pub velocity_spike_multiplier: f64,
    /// Share of recent volume to a single country that counts as concentration
    pub geo_concentration_threshold: f64,
    /// ISO country codes treated as high-risk
    pub high_risk_countries: Vec<String>,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            structuring_window_hours: 24,
            structuring_threshold: 10_000.0,
            structuring_min_tx_count: 3,
            rapid_cycling_window_mins: 60,
            rapid_cycling_threshold: 0.9,
            velocity_baseline_days: 30,
            velocity_spike_multiplier: 10.0,
            geo_concentration_threshold: 0.8,
            high_risk_countries: ["IR", "KP", "SY", "CU", "VE", "MM", "BY", "RU"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Downstream compliance thresholds. Informational to the engine; surfaced so
/// callers can decide on SAR review and CTR filing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub sar_threshold: f64,
    pub ctr_threshold: f64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            sar_threshold: 70.0,
            ctr_threshold: 10_000.0,
        }
    }
}

/// Deployment environment, selected via `AMLSCREEN_ENV`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        let env = env::var("AMLSCREEN_ENV").unwrap_or_else(|_| "development".to_string());
        match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            "testing" | "test" => Environment::Testing,
            _ => Environment::Development,
        }
    }

    fn config_file(self) -> &'static str {
        match self {
            Environment::Production => "production.toml",
            Environment::Staging => "staging.toml",
            Environment::Testing => "testing.toml",
            Environment::Development => "development.toml",
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let environment = Environment::from_env();

        let base_path = env::var("AMLSCREEN_CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
        let config_path = PathBuf::from(base_path).join(environment.config_file());

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Config::default()
        };

        config.override_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Override configuration with environment variables
    fn override_from_env(&mut self) -> Result<()> {
        if let Ok(val) = env::var("AMLSCREEN_MAX_SCREENING_LATENCY_MS") {
            let ms: u64 = val
                .parse()
                .map_err(|_| Error::Config("invalid max screening latency".to_string()))?;
            self.screening.max_screening_latency = Duration::from_millis(ms);
        }

        if let Ok(val) = env::var("AMLSCREEN_FUZZY_MATCH_THRESHOLD") {
            self.screening.fuzzy_match_threshold = val
                .parse()
                .map_err(|_| Error::Config("invalid fuzzy match threshold".to_string()))?;
        }

        if let Ok(val) = env::var("AMLSCREEN_HIGH_RISK_COUNTRIES") {
            self.patterns.high_risk_countries =
                val.split(',').map(|c| c.trim().to_string()).collect();
        }

        if let Ok(val) = env::var("AMLSCREEN_SAR_THRESHOLD") {
            self.compliance.sar_threshold = val
                .parse()
                .map_err(|_| Error::Config("invalid SAR threshold".to_string()))?;
        }

        if let Ok(val) = env::var("AMLSCREEN_CTR_THRESHOLD") {
            self.compliance.ctr_threshold = val
                .parse()
                .map_err(|_| Error::Config("invalid CTR threshold".to_string()))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.screening.max_screening_latency.is_zero() {
            return Err(Error::Config(
                "max_screening_latency must be non-zero".to_string(),
            ));
        }
        if self.screening.parallel_checks == 0 {
            return Err(Error::Config("parallel_checks must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.screening.fuzzy_match_threshold)
            || self.screening.fuzzy_match_threshold == 0.0
        {
            return Err(Error::Config(
                "fuzzy_match_threshold must be in (0, 1]".to_string(),
            ));
        }
        if self.patterns.structuring_min_tx_count == 0 {
            return Err(Error::Config(
                "structuring_min_tx_count must be >= 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.patterns.rapid_cycling_threshold) {
            return Err(Error::Config(
                "rapid_cycling_threshold must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.patterns.geo_concentration_threshold) {
            return Err(Error::Config(
                "geo_concentration_threshold must be in [0, 1]".to_string(),
            ));
        }
        if self.patterns.velocity_spike_multiplier < 1.0 {
            return Err(Error::Config(
                "velocity_spike_multiplier must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Detection configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override file (explicit path, or
//!    ~/.local/share/tally/config/detection.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Override files may be partial; missing keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/detection.toml");

/// Fewer charges than this cannot establish a period
pub const MIN_OCCURRENCES_FLOOR: usize = 3;

/// Longest grace period accepted, in days
pub const MAX_GRACE_PERIOD_DAYS: i64 = 366;

/// Recurring detection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    /// Minimum transactions in a merchant group before a period is inferred
    pub min_occurrences: usize,
    /// Minimum distinct calendar dates the group must span
    pub min_distinct_dates: usize,
    /// Days past the expected date before a charge is flagged as missed
    pub grace_period_days: i64,
    /// Only consider expense transactions
    pub expenses_only: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_occurrences: MIN_OCCURRENCES_FLOOR,
            min_distinct_dates: 2,
            grace_period_days: 3,
            expenses_only: true,
        }
    }
}

impl DetectionConfig {
    /// Load configuration (override first, then default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) if path.exists() => read_config(path)?,
            Some(_) => DEFAULT_CONFIG.to_string(),
            None => match default_config_path() {
                Some(path) if path.exists() => read_config(&path)?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::parse(&content)
    }

    /// Parse config from TOML content, applying it over the defaults
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(detection) = raw.detection {
            if let Some(min) = detection.min_occurrences {
                config.min_occurrences = min;
            }
            if let Some(min) = detection.min_distinct_dates {
                config.min_distinct_dates = min;
            }
            if let Some(days) = detection.grace_period_days {
                config.grace_period_days = days;
            }
            if let Some(expenses_only) = detection.expenses_only {
                config.expenses_only = expenses_only;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would let detection report unsupported periods
    pub fn validate(&self) -> Result<()> {
        if self.min_occurrences < MIN_OCCURRENCES_FLOOR {
            return Err(Error::Config(format!(
                "min_occurrences must be at least {}, got {}",
                MIN_OCCURRENCES_FLOOR, self.min_occurrences
            )));
        }
        if self.min_distinct_dates < 2 {
            return Err(Error::Config(format!(
                "min_distinct_dates must be at least 2, got {}",
                self.min_distinct_dates
            )));
        }
        if !(0..=MAX_GRACE_PERIOD_DAYS).contains(&self.grace_period_days) {
            return Err(Error::Config(format!(
                "grace_period_days must be between 0 and {}, got {}",
                MAX_GRACE_PERIOD_DAYS, self.grace_period_days
            )));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("detection.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    detection: Option<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    min_occurrences: Option<usize>,
    min_distinct_dates: Option<usize>,
    grace_period_days: Option<i64>,
    expenses_only: Option<bool>,
}

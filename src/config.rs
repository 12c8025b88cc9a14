//! Configuration for the aggregator and the CLI.
//!
//! Values come from an optional `sales-metrics.toml`; command-line flags
//! override them in `main`.

use crate::error::{Result, SalesMetricsError};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "sales-metrics.toml";

/// The two calendar years the month heuristic chooses between when a record
/// has no usable date: June–December fall in `start_year`, January–May in
/// the year after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    pub start_year: i32,
}

impl SeasonConfig {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn earlier_year(&self) -> i32 {
        self.start_year
    }

    pub fn later_year(&self) -> i32 {
        self.start_year + 1
    }
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self { start_year: 2025 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Rows shown per table in console previews.
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SalesMetricsConfig {
    pub season: SeasonConfig,
    pub output: OutputConfig,
}

pub fn parse_config(contents: &str, path: &Path) -> Result<SalesMetricsConfig> {
    toml::from_str::<SalesMetricsConfig>(contents).map_err(|e| SalesMetricsError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load configuration.
///
/// An explicit path must exist and parse. Without one, `sales-metrics.toml`
/// in the working directory is used when present; a broken implicit file is
/// logged and replaced by defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<SalesMetricsConfig> {
    if let Some(path) = explicit {
        let contents = fs::read_to_string(path).map_err(|e| SalesMetricsError::io(path, e))?;
        let config = parse_config(&contents, path)?;
        log::debug!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let path = Path::new(DEFAULT_CONFIG_FILE);
    match fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents, path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                log::warn!("{}. Using defaults.", e);
                Ok(SalesMetricsConfig::default())
            }
        },
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Failed to read config file {}: {}", path.display(), e);
            }
            Ok(SalesMetricsConfig::default())
        }
    }
}

//! Scheduler configuration.
//!
//! Loaded from TOML so precision levels, input locations and the model
//! retention policy can change without code changes.
//!
//! ```
//! use run_scheduler::config::SchedulerConfig;
//! use run_scheduler::loader::LoadPolicy;
//!
//! let config = SchedulerConfig::from_toml_str(r#"
//!     event = "spring-2024"
//!     routes_dir = "routes"
//!     exchanges = "exchanges.geojson"
//!     distance_precision = 3
//!     load_policy = "abort"
//! "#).unwrap();
//!
//! assert_eq!(config.precision().distance, 3);
//! assert_eq!(config.load_policy, LoadPolicy::Abort);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Exchange, Route};
use crate::loader::{GeoDataLoader, LoadError, LoadPolicy};
use crate::precision::PrecisionPair;
use crate::processor::ProcessorOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_distance_precision() -> i32 {
    2
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Event (season) name; part of the output directory name.
    pub event: String,

    /// Directory of per-route GeoJSON files.
    #[serde(default)]
    pub routes_dir: Option<PathBuf>,

    /// YAML table of routes, used when there is no route directory.
    #[serde(default)]
    pub routes_table: Option<PathBuf>,

    /// Exchange registry (GeoJSON or CSV).
    pub exchanges: PathBuf,

    /// Rule files handed to the solver alongside the facts.
    #[serde(default)]
    pub rules: Vec<PathBuf>,

    /// Output directory; defaults to `solutions/<event>_<start time>`.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Decimal places kept when encoding distances.
    #[serde(default = "default_distance_precision")]
    pub distance_precision: i32,

    /// Decimal places kept when encoding durations.
    #[serde(default)]
    pub duration_precision: i32,

    #[serde(default)]
    pub save_all_models: bool,

    /// Write each model's facts next to its solution document.
    #[serde(default)]
    pub save_facts: bool,

    #[serde(default)]
    pub load_policy: LoadPolicy,

    #[serde(default)]
    pub stop_after_optimal: Option<u64>,
}

impl SchedulerConfig {
    pub fn new(event: impl Into<String>, exchanges: impl Into<PathBuf>) -> Self {
        Self {
            event: event.into(),
            routes_dir: None,
            routes_table: None,
            exchanges: exchanges.into(),
            rules: Vec::new(),
            out_dir: None,
            distance_precision: default_distance_precision(),
            duration_precision: 0,
            save_all_models: false,
            save_facts: false,
            load_policy: LoadPolicy::default(),
            stop_after_optimal: None,
        }
    }

    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event.trim().is_empty() {
            return Err(ConfigError::Invalid("event must not be empty".to_string()));
        }
        if self.routes_dir.is_none() && self.routes_table.is_none() {
            return Err(ConfigError::Invalid(
                "one of routes_dir or routes_table is required".to_string(),
            ));
        }
        if self.stop_after_optimal == Some(0) {
            return Err(ConfigError::Invalid(
                "stop_after_optimal must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_routes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.routes_dir = Some(dir.into());
        self
    }

    pub fn with_routes_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.routes_table = Some(path.into());
        self
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn with_precision(mut self, precision: PrecisionPair) -> Self {
        self.distance_precision = precision.distance;
        self.duration_precision = precision.duration;
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    pub fn with_save_all_models(mut self, save_all_models: bool) -> Self {
        self.save_all_models = save_all_models;
        self
    }

    pub fn with_stop_after_optimal(mut self, count: u64) -> Self {
        self.stop_after_optimal = Some(count);
        self
    }

    pub fn precision(&self) -> PrecisionPair {
        PrecisionPair {
            distance: self.distance_precision,
            duration: self.duration_precision,
        }
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            event: self.event.clone(),
            precision: self.precision(),
            save_all_models: self.save_all_models,
            stop_after_optimal: self.stop_after_optimal,
        }
    }

    pub fn loader(&self) -> GeoDataLoader {
        GeoDataLoader::new(self.load_policy)
    }

    /// Reads the configured routes and exchanges. A route directory takes
    /// precedence over a route table.
    pub fn load_inputs(&self) -> Result<(Vec<Route>, BTreeMap<String, Exchange>), LoadError> {
        let loader = self.loader();
        let routes = match (&self.routes_dir, &self.routes_table) {
            (Some(dir), _) => loader.load_routes_from_dir(dir)?,
            (None, Some(table)) => loader.load_routes_from_table(table)?,
            (None, None) => Vec::new(),
        };
        let exchanges = loader.load_exchanges(&self.exchanges)?;
        Ok((routes, exchanges))
    }
}

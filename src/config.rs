// ⚙️ Configuration - layered with figment
//
// Sources (highest wins):
//   1. WAGE_DASHBOARD_* environment variables (`__` separates sections)
//   2. ./wage-dashboard.toml
//   3. Built-in defaults

use crate::error::ConfigError;
use crate::filter::{CompensationMetric, YearRange};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "wage-dashboard.toml";
pub const ENV_PREFIX: &str = "WAGE_DASHBOARD_";

/// Longest idle timeout accepted for a server session (one week)
pub const MAX_SESSION_IDLE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub jobs_path: PathBuf,
    pub names_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            jobs_path: PathBuf::from("data/salaries_by_job.csv"),
            names_path: PathBuf::from("data/salaries_by_name.csv"),
        }
    }
}

/// Year bounds offered by the range control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBounds {
    pub min: i32,
    pub max: i32,
}

impl Default for YearBounds {
    fn default() -> Self {
        Self { min: 2011, max: 2021 }
    }
}

impl YearBounds {
    pub fn full_range(&self) -> YearRange {
        YearRange {
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub jobs: Vec<String>,
    pub metric: CompensationMetric,
    pub starting_value: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            jobs: [
                "GSR (Step 5)",
                "Teaching Assistant",
                "Assistant Professor (II)",
                "Associate Professor (II)",
                "Professor (II)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            metric: CompensationMetric::Gross,
            starting_value: 50_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Above this many unique names the search asks for a narrower query
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub session_idle_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            session_idle_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub years: YearBounds,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl DashboardConfig {
    /// Load from defaults, `wage-dashboard.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.min > self.years.max {
            return Err(ConfigError::Invalid(format!(
                "years.min ({}) is after years.max ({})",
                self.years.min, self.years.max
            )));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        let idle = self.server.session_idle_minutes;
        if !(1..=MAX_SESSION_IDLE_MINUTES).contains(&idle) {
            return Err(ConfigError::Invalid(format!(
                "server.session_idle_minutes ({}) must be between 1 and {}",
                idle, MAX_SESSION_IDLE_MINUTES
            )));
        }
        Ok(())
    }
}

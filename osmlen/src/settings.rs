use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::collect::global_variables::{BOUNDARY_PATH, OVERPASS_URL, QUERY_TIMEOUT_SECS, USER_AGENT};
use crate::collect::overpass::RetryPolicy;
use crate::measure::MeasureOptions;

/// Run configuration. Missing fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Overpass interpreter URL
    pub endpoint: String,
    pub user_agent: String,
    /// Server-side query timeout, seconds
    pub timeout_secs: u32,
    /// Maximum projected area of one query piece, km²
    pub area_threshold_km2: f64,
    pub max_depth: usize,
    pub simplify: bool,
    /// Maximum WKT length of one query piece, characters
    pub simplify_limit: usize,
    pub max_simplify_passes: usize,
    pub max_attempts: usize,
    /// Pause after an HTTP 429, seconds
    pub overload_pause_secs: u64,
    /// Pause after any other failed attempt, seconds
    pub retry_delay_secs: u64,
    /// Pause between two boundaries, seconds
    pub boundary_pause_secs: u64,
    pub boundary_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let measure = MeasureOptions::default();
        let retry = RetryPolicy::default();
        Settings {
            endpoint: OVERPASS_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: QUERY_TIMEOUT_SECS,
            area_threshold_km2: measure.area_threshold_km2,
            max_depth: measure.max_depth,
            simplify: measure.simplify,
            simplify_limit: measure.simplify_limit,
            max_simplify_passes: measure.max_simplify_passes,
            max_attempts: retry.max_attempts,
            overload_pause_secs: retry.overload_pause.as_secs(),
            retry_delay_secs: retry.retry_delay.as_secs(),
            boundary_pause_secs: 1,
            boundary_dir: PathBuf::from(BOUNDARY_PATH),
        }
    }
}

impl Settings {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        ensure!(
            self.area_threshold_km2 > 0.0,
            "area_threshold_km2 must be positive, got {}",
            self.area_threshold_km2
        );
        ensure!(self.simplify_limit > 0, "simplify_limit must be positive");
        ensure!(self.max_attempts > 0, "max_attempts must be at least 1");
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).with_context(|| format!("Invalid Overpass endpoint: {}", self.endpoint))
    }

    pub fn measure_options(&self) -> MeasureOptions {
        MeasureOptions {
            area_threshold_km2: self.area_threshold_km2,
            max_depth: self.max_depth,
            simplify: self.simplify,
            simplify_limit: self.simplify_limit,
            max_simplify_passes: self.max_simplify_passes,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            overload_pause: Duration::from_secs(self.overload_pause_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn boundary_pause(&self) -> Duration {
        Duration::from_secs(self.boundary_pause_secs)
    }
}

//! Pipeline configuration.

use crate::error::{PipelineError, Result};
use crate::pipeline::{Executor, ForecastOptions, IntervalMethod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every stage of a [`Pipeline`](crate::pipeline::Pipeline).
///
/// Missing JSON fields take their default values:
///
/// ```
/// use anofox_ensemble::config::PipelineConfig;
///
/// let config = PipelineConfig::from_json(r#"{"level": 0.8, "interval": "empirical_quantile"}"#).unwrap();
/// assert!(config.parallel);
/// assert_eq!(config.model_timeout_ms, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Confidence level of prediction intervals, in (0, 1).
    pub level: f64,
    /// Interval policy.
    pub interval: IntervalMethod,
    /// Run per-model work on the rayon pool.
    pub parallel: bool,
    /// Per-model time budget for refit and predict calls.
    pub model_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            level: 0.95,
            interval: IntervalMethod::ResidualStdDev,
            parallel: true,
            model_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidParameter(format!("pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    pub fn with_interval(mut self, interval: IntervalMethod) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "level must be in (0, 1), got {}",
                self.level
            )));
        }
        if self.model_timeout_ms == Some(0) {
            return Err(PipelineError::InvalidParameter(
                "model timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn executor(&self) -> Executor {
        let executor = if self.parallel {
            Executor::parallel()
        } else {
            Executor::sequential()
        };
        match self.model_timeout_ms {
            Some(ms) => executor.with_timeout(Duration::from_millis(ms)),
            None => executor,
        }
    }

    pub fn forecast_options(&self) -> ForecastOptions {
        ForecastOptions::new(self.level, self.interval)
    }
}

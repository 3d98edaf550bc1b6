//! Hyperparameter sets for the supported model families.
//!
//! The pipeline never branches on the family: specs travel inside a
//! [`FitRequest`](crate::models::FitRequest) to the backend, and the pipeline
//! only uses them to label entries and to validate obviously broken settings
//! before a backend sees them.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Arima,
    Prophet,
    ExponentialSmoothing,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Arima => f.write_str("ARIMA"),
            ModelFamily::Prophet => f.write_str("Prophet"),
            ModelFamily::ExponentialSmoothing => f.write_str("ETS"),
        }
    }
}

/// Family-tagged hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelSpec {
    Arima(ARIMASpec),
    Prophet(ProphetSpec),
    ExponentialSmoothing(ETSSpec),
}

impl ModelSpec {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelSpec::Arima(_) => ModelFamily::Arima,
            ModelSpec::Prophet(_) => ModelFamily::Prophet,
            ModelSpec::ExponentialSmoothing(_) => ModelFamily::ExponentialSmoothing,
        }
    }

    /// Reject settings no backend of the family could accept.
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::Arima(spec) => spec.validate(),
            ModelSpec::Prophet(spec) => spec.validate(),
            ModelSpec::ExponentialSmoothing(spec) => spec.validate(),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSpec::Arima(spec) => fmt::Display::fmt(spec, f),
            ModelSpec::Prophet(spec) => fmt::Display::fmt(spec, f),
            ModelSpec::ExponentialSmoothing(spec) => fmt::Display::fmt(spec, f),
        }
    }
}

impl From<ARIMASpec> for ModelSpec {
    fn from(spec: ARIMASpec) -> Self {
        ModelSpec::Arima(spec)
    }
}

impl From<ProphetSpec> for ModelSpec {
    fn from(spec: ProphetSpec) -> Self {
        ModelSpec::Prophet(spec)
    }
}

impl From<ETSSpec> for ModelSpec {
    fn from(spec: ETSSpec) -> Self {
        ModelSpec::ExponentialSmoothing(spec)
    }
}

// ============================================================================
// ARIMA
// ============================================================================

/// Seasonal (P, D, Q)[s] part of a SARIMA specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// ARIMA(p, d, q)(P, D, Q)[s] specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    #[serde(default)]
    pub seasonal: Option<SeasonalOrder>,
    /// Let the backend search orders, using (p, d, q) as upper bounds.
    #[serde(default)]
    pub auto: bool,
}

impl ARIMASpec {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal: None,
            auto: false,
        }
    }

    /// Automatic order selection bounded by (p, d, q).
    pub fn auto(max_p: usize, max_d: usize, max_q: usize) -> Self {
        Self {
            auto: true,
            ..Self::new(max_p, max_d, max_q)
        }
    }

    pub fn with_seasonal(mut self, p: usize, d: usize, q: usize, period: usize) -> Self {
        self.seasonal = Some(SeasonalOrder { p, d, q, period });
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(seasonal) = self.seasonal {
            if seasonal.period < 2 {
                return Err(PipelineError::InvalidParameter(format!(
                    "seasonal period must be at least 2, got {}",
                    seasonal.period
                )));
            }
        }
        Ok(())
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.auto {
            f.write_str("Auto")?;
        }
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if let Some(s) = self.seasonal {
            write!(f, "({},{},{})[{}]", s.p, s.d, s.q, s.period)?;
        }
        Ok(())
    }
}

// ============================================================================
// Prophet
// ============================================================================

/// Trend growth of a Prophet model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    #[default]
    Linear,
    Logistic,
    Flat,
}

/// How seasonal components combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Prophet specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetSpec {
    pub growth: Growth,
    pub seasonality_mode: SeasonalityMode,
    /// Flexibility of the piecewise trend.
    pub changepoint_prior_scale: f64,
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    /// Let a boosted learner model the Prophet residuals.
    pub boosted: bool,
}

impl Default for ProphetSpec {
    fn default() -> Self {
        Self {
            growth: Growth::Linear,
            seasonality_mode: SeasonalityMode::Additive,
            changepoint_prior_scale: 0.05,
            yearly_seasonality: true,
            weekly_seasonality: false,
            boosted: false,
        }
    }
}

impl ProphetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_seasonality_mode(mut self, mode: SeasonalityMode) -> Self {
        self.seasonality_mode = mode;
        self
    }

    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Self {
        self.changepoint_prior_scale = scale;
        self
    }

    pub fn boosted(mut self) -> Self {
        self.boosted = true;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.changepoint_prior_scale.is_finite() && self.changepoint_prior_scale > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "changepoint_prior_scale must be positive, got {}",
                self.changepoint_prior_scale
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ProphetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let growth = match self.growth {
            Growth::Linear => "linear",
            Growth::Logistic => "logistic",
            Growth::Flat => "flat",
        };
        let mode = match self.seasonality_mode {
            SeasonalityMode::Additive => "additive",
            SeasonalityMode::Multiplicative => "multiplicative",
        };
        let name = if self.boosted { "Prophet+Boost" } else { "Prophet" };
        write!(f, "{}({}, {})", name, growth, mode)
    }
}

// ============================================================================
// Exponential smoothing
// ============================================================================

/// Error component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    #[default]
    Additive,
    Multiplicative,
}

/// Trend component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    #[default]
    None,
    Additive,
    AdditiveDamped,
}

/// Seasonal component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalType {
    #[default]
    None,
    Additive,
    Multiplicative,
}

/// ETS model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ETSSpec {
    #[serde(default)]
    pub error: ErrorType,
    #[serde(default)]
    pub trend: TrendType,
    #[serde(default)]
    pub seasonal: SeasonalType,
    /// Seasonal period, required when `seasonal` is not `None`.
    #[serde(default)]
    pub period: Option<usize>,
}

impl ETSSpec {
    pub fn new(error: ErrorType, trend: TrendType, seasonal: SeasonalType) -> Self {
        Self {
            error,
            trend,
            seasonal,
            period: None,
        }
    }

    /// ETS(A,N,N) - Simple exponential smoothing.
    pub fn ann() -> Self {
        Self::new(ErrorType::Additive, TrendType::None, SeasonalType::None)
    }

    /// ETS(A,A,N) - Holt's linear method.
    pub fn aan() -> Self {
        Self::new(ErrorType::Additive, TrendType::Additive, SeasonalType::None)
    }

    /// ETS(A,Ad,N) - Damped trend.
    pub fn aadn() -> Self {
        Self::new(
            ErrorType::Additive,
            TrendType::AdditiveDamped,
            SeasonalType::None,
        )
    }

    /// ETS(A,A,A) - Holt-Winters additive with the given period.
    pub fn aaa(period: usize) -> Self {
        Self::new(
            ErrorType::Additive,
            TrendType::Additive,
            SeasonalType::Additive,
        )
        .with_period(period)
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Some(period);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.seasonal != SeasonalType::None {
            match self.period {
                Some(p) if p >= 2 => {}
                other => {
                    return Err(PipelineError::InvalidParameter(format!(
                        "seasonal ETS needs a period of at least 2, got {:?}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ETSSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = match self.error {
            ErrorType::Additive => "A",
            ErrorType::Multiplicative => "M",
        };
        let t = match self.trend {
            TrendType::None => "N",
            TrendType::Additive => "A",
            TrendType::AdditiveDamped => "Ad",
        };
        let s = match self.seasonal {
            SeasonalType::None => "N",
            SeasonalType::Additive => "A",
            SeasonalType::Multiplicative => "M",
        };
        write!(f, "ETS({},{},{})", e, t, s)
    }
}

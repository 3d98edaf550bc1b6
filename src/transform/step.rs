//! Single preprocessing steps and their monotone inverses.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a preprocessing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// `(x - mean) / std`
    Standardize,
    /// Logarithm in `base`.
    Log,
    /// Box-Cox power transform with `lambda`.
    BoxCox,
    /// `x + offset`
    Shift,
    /// `x * x`; not invertible over the reals.
    Square,
}

impl TransformKind {
    /// Parameters a step of this kind must declare.
    pub fn required_parameters(self) -> &'static [&'static str] {
        match self {
            TransformKind::Standardize => &["mean", "std"],
            TransformKind::Log => &["base"],
            TransformKind::BoxCox => &["lambda"],
            TransformKind::Shift => &["offset"],
            TransformKind::Square => &[],
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformKind::Standardize => "standardize",
            TransformKind::Log => "log",
            TransformKind::BoxCox => "box_cox",
            TransformKind::Shift => "shift",
            TransformKind::Square => "square",
        };
        f.write_str(name)
    }
}

/// One declared step: its kind plus named numeric parameters.
///
/// Serialized flat, e.g. `{"kind": "standardize", "mean": 10.0, "std": 2.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    pub kind: TransformKind,
    #[serde(flatten)]
    pub params: BTreeMap<String, f64>,
}

impl TransformStep {
    /// A step without parameters; add them with [`TransformStep::with_param`].
    pub fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn standardize(mean: f64, std: f64) -> Self {
        Self::new(TransformKind::Standardize)
            .with_param("mean", mean)
            .with_param("std", std)
    }

    pub fn log(base: f64) -> Self {
        Self::new(TransformKind::Log).with_param("base", base)
    }

    pub fn natural_log() -> Self {
        Self::log(std::f64::consts::E)
    }

    pub fn box_cox(lambda: f64) -> Self {
        Self::new(TransformKind::BoxCox).with_param("lambda", lambda)
    }

    pub fn shift(offset: f64) -> Self {
        Self::new(TransformKind::Shift).with_param("offset", offset)
    }

    pub fn square() -> Self {
        Self::new(TransformKind::Square)
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Check parameters and build the numeric form of this step.
    ///
    /// `step` is the 1-based position in the chain, used in errors.
    pub(crate) fn resolve(&self, step: usize) -> Result<Resolved> {
        let get = |parameter: &'static str| {
            self.param(parameter)
                .ok_or(PipelineError::MissingTransformParameters {
                    step,
                    kind: self.kind,
                    parameter,
                })
        };
        let non_invertible = |reason: String| PipelineError::NonInvertibleTransform {
            step,
            kind: self.kind,
            reason,
        };

        let resolved = match self.kind {
            TransformKind::Standardize => {
                let (mean, std) = (get("mean")?, get("std")?);
                if !(std.is_finite() && std > 0.0) {
                    return Err(non_invertible(format!(
                        "standard deviation must be positive, got {}",
                        std
                    )));
                }
                Resolved::Standardize { mean, std }
            }
            TransformKind::Log => {
                let base = get("base")?;
                if !(base.is_finite() && base > 1.0) {
                    return Err(non_invertible(format!(
                        "log base must be greater than 1, got {}",
                        base
                    )));
                }
                Resolved::Log { ln_base: base.ln() }
            }
            TransformKind::BoxCox => {
                let lambda = get("lambda")?;
                if !lambda.is_finite() {
                    return Err(non_invertible(format!("lambda must be finite, got {}", lambda)));
                }
                Resolved::BoxCox { lambda }
            }
            TransformKind::Shift => {
                let offset = get("offset")?;
                if !offset.is_finite() {
                    return Err(non_invertible(format!("offset must be finite, got {}", offset)));
                }
                Resolved::Shift { offset }
            }
            TransformKind::Square => Resolved::Square,
        };
        Ok(resolved)
    }
}

/// A step with validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Resolved {
    Standardize { mean: f64, std: f64 },
    Log { ln_base: f64 },
    BoxCox { lambda: f64 },
    Shift { offset: f64 },
    Square,
}

impl Resolved {
    /// Forward transform of a single value; `None` outside the domain.
    pub(crate) fn forward(self, x: f64) -> Option<f64> {
        match self {
            Resolved::Standardize { mean, std } => Some((x - mean) / std),
            Resolved::Log { ln_base } => (x > 0.0).then(|| x.ln() / ln_base),
            Resolved::BoxCox { lambda } => {
                if x <= 0.0 {
                    None
                } else if lambda.abs() < 1e-10 {
                    Some(x.ln())
                } else {
                    Some((x.powf(lambda) - 1.0) / lambda)
                }
            }
            Resolved::Shift { offset } => Some(x + offset),
            Resolved::Square => Some(x * x),
        }
    }

    /// Inverse of a single value; `None` outside the inverse domain.
    pub(crate) fn inverse(self, y: f64) -> Option<f64> {
        match self {
            Resolved::Standardize { mean, std } => Some(y * std + mean),
            Resolved::Log { ln_base } => Some((y * ln_base).exp()),
            Resolved::BoxCox { lambda } => {
                if lambda.abs() < 1e-10 {
                    Some(y.exp())
                } else {
                    let val = lambda * y + 1.0;
                    (val > 0.0).then(|| val.powf(1.0 / lambda))
                }
            }
            Resolved::Shift { offset } => Some(y - offset),
            Resolved::Square => None,
        }
    }

    /// Inverse of a lower interval bound.
    ///
    /// Box-Cox with a positive lambda maps bounds below its inverse domain
    /// to the limit 0; every other case is [`Resolved::inverse`].
    pub(crate) fn inverse_lower(self, y: f64) -> Option<f64> {
        match self {
            Resolved::BoxCox { lambda } if lambda >= 1e-10 && lambda * y + 1.0 <= 0.0 => Some(0.0),
            _ => self.inverse(y),
        }
    }

    pub(crate) fn is_invertible(self) -> bool {
        !matches!(self, Resolved::Square)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn resolve_reports_the_missing_parameter() {
        let step = TransformStep::new(TransformKind::Standardize).with_param("mean", 1.0);
        assert_eq!(
            step.resolve(2).unwrap_err(),
            PipelineError::MissingTransformParameters {
                step: 2,
                kind: TransformKind::Standardize,
                parameter: "std",
            }
        );
    }

    #[test]
    fn resolve_rejects_non_monotone_parameters() {
        for step in [
            TransformStep::standardize(0.0, 0.0),
            TransformStep::standardize(0.0, -1.0),
            TransformStep::log(1.0),
            TransformStep::log(0.5),
            TransformStep::log(-2.0),
        ] {
            assert!(
                matches!(step.resolve(1), Err(PipelineError::NonInvertibleTransform { .. })),
                "{:?} should not resolve",
                step
            );
        }
    }

    #[test]
    fn boxcox_matches_log_at_lambda_zero() {
        let step = TransformStep::box_cox(0.0).resolve(1).unwrap();
        assert_relative_eq!(step.forward(10.0).unwrap(), 10.0_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(step.inverse(2.0).unwrap(), 2.0_f64.exp(), epsilon = 1e-12);
    }

    #[test]
    fn boxcox_known_values() {
        let step = TransformStep::box_cox(0.5).resolve(1).unwrap();
        // (4^0.5 - 1) / 0.5 = 2
        assert_relative_eq!(step.forward(4.0).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(step.inverse(2.0).unwrap(), 4.0, epsilon = 1e-12);
        assert_eq!(step.forward(-1.0), None);
        // 0.5 * -3 + 1 < 0
        assert_eq!(step.inverse(-3.0), None);
        assert_eq!(step.inverse_lower(-3.0), Some(0.0));
        assert_relative_eq!(step.inverse_lower(2.0).unwrap(), 4.0, epsilon = 1e-12);

        // no finite limit for a negative lambda
        let step = TransformStep::box_cox(-0.5).resolve(1).unwrap();
        assert_eq!(step.inverse_lower(3.0), None);
    }

    #[test]
    fn log_base_ten() {
        let step = TransformStep::log(10.0).resolve(1).unwrap();
        assert_relative_eq!(step.forward(1000.0).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(step.inverse(2.0).unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(step.forward(0.0), None);
    }

    #[test]
    fn square_resolves_but_does_not_invert() {
        let step = TransformStep::square().resolve(1).unwrap();
        assert!(!step.is_invertible());
        assert_eq!(step.forward(-3.0), Some(9.0));
        assert_eq!(step.inverse(9.0), None);
    }

    #[test]
    fn steps_serialize_flat() {
        let step = TransformStep::standardize(10.0, 2.5);
        let json = serde_json::to_string(&step).unwrap();
        assert_eq!(json, r#"{"kind":"standardize","mean":10.0,"std":2.5}"#);

        let parsed: TransformStep = serde_json::from_str(r#"{"kind":"box_cox","lambda":0.25}"#).unwrap();
        assert_eq!(parsed, TransformStep::box_cox(0.25));
        assert_eq!(TransformKind::BoxCox.to_string(), "box_cox");
    }
}

//! Ordered transform chains and forecast inversion.

use crate::core::Scale;
use crate::error::{PipelineError, Result};
use crate::pipeline::forecast::{ForecastRecord, ForecastSet};
use crate::transform::step::{Resolved, TransformStep};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Preprocessing steps in the order they were applied to the target.
///
/// Serialized as a plain JSON array of steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformChain {
    steps: Vec<TransformStep>,
}

impl TransformChain {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self { steps }
    }

    /// The empty chain; inversion only re-tags the scale.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Append a step applied after the existing ones.
    pub fn then(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply the steps in declared order.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>> {
        let steps = self.resolve()?;
        values
            .iter()
            .map(|&x| {
                steps.iter().enumerate().try_fold(x, |acc, (i, step)| {
                    let y = step.forward(acc).ok_or_else(|| {
                        PipelineError::ComputationError(format!(
                            "value {} is outside the domain of transform step {} ({})",
                            acc,
                            i + 1,
                            self.steps[i].kind
                        ))
                    })?;
                    finite(y)
                })
            })
            .collect()
    }

    /// Undo the steps in reverse order.
    ///
    /// Every step is checked before any value is touched, so a chain with a
    /// non-invertible step fails whatever the input.
    pub fn inverse(&self, values: &[f64]) -> Result<Vec<f64>> {
        let steps = self.resolve_invertible()?;
        values.iter().map(|&y| self.invert_value(&steps, y)).collect()
    }

    /// Map point, bounds and actuals of a transformed-scale forecast set
    /// back to the original scale.
    ///
    /// Lower bounds below a positive-lambda Box-Cox domain become 0.
    pub fn invert(&self, set: &ForecastSet) -> Result<ForecastSet> {
        if set.scale() != Scale::Transformed {
            return Err(PipelineError::ScaleMismatch {
                expected: Scale::Transformed,
                got: set.scale(),
            });
        }
        let steps = self.resolve_invertible()?;

        let records = set
            .records()
            .iter()
            .map(|r| {
                Ok(ForecastRecord {
                    actual: r.actual.map(|a| self.invert_value(&steps, a)).transpose()?,
                    point: self.invert_value(&steps, r.point)?,
                    lower: self.invert_with(&steps, r.lower, Resolved::inverse_lower)?,
                    upper: self.invert_value(&steps, r.upper)?,
                    ..*r
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(steps = self.len(), records = records.len(), "inverted forecast set");
        Ok(set.rescaled(Scale::Original, records))
    }

    fn resolve(&self) -> Result<Vec<Resolved>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| step.resolve(i + 1))
            .collect()
    }

    fn resolve_invertible(&self) -> Result<Vec<Resolved>> {
        let steps = self.resolve()?;
        if let Some(i) = steps.iter().position(|s| !s.is_invertible()) {
            return Err(PipelineError::NonInvertibleTransform {
                step: i + 1,
                kind: self.steps[i].kind,
                reason: "not monotonic over the reals".to_string(),
            });
        }
        Ok(steps)
    }

    fn invert_value(&self, steps: &[Resolved], y: f64) -> Result<f64> {
        self.invert_with(steps, y, Resolved::inverse)
    }

    fn invert_with(
        &self,
        steps: &[Resolved],
        y: f64,
        inverse: fn(Resolved, f64) -> Option<f64>,
    ) -> Result<f64> {
        steps.iter().enumerate().rev().try_fold(y, |acc, (i, &step)| {
            let x = inverse(step, acc)
                .ok_or_else(|| PipelineError::NonInvertibleTransform {
                    step: i + 1,
                    kind: self.steps[i].kind,
                    reason: format!("value {} is outside the inverse domain", acc),
                })?;
            finite(x)
        })
    }
}

impl From<Vec<TransformStep>> for TransformChain {
    fn from(steps: Vec<TransformStep>) -> Self {
        Self::new(steps)
    }
}

fn finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PipelineError::ComputationError(format!(
            "transform produced non-finite value {}",
            value
        )))
    }
}

//! Point predictions returned by a backend, with an optional native interval.

use crate::error::{PipelineError, Result};

/// Output of a single `predict` call: one point estimate per requested row,
/// plus the backend's own interval when it produces one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    point: Vec<f64>,
    /// Lower and upper bounds of the backend's native interval.
    interval: Option<(Vec<f64>, Vec<f64>)>,
}

impl Prediction {
    /// Create an empty prediction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prediction from point estimates only.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            interval: None,
        }
    }

    /// Create a prediction with a native interval.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        for bound in [&lower, &upper] {
            if bound.len() != values.len() {
                return Err(PipelineError::DimensionMismatch {
                    expected: values.len(),
                    got: bound.len(),
                });
            }
        }
        Ok(Self {
            point: values,
            interval: Some((lower, upper)),
        })
    }

    /// Number of predicted rows.
    pub fn len(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn has_intervals(&self) -> bool {
        self.interval.is_some()
    }

    pub fn lower(&self) -> Option<&[f64]> {
        self.interval.as_ref().map(|(l, _)| l.as_slice())
    }

    pub fn upper(&self) -> Option<&[f64]> {
        self.interval.as_ref().map(|(_, u)| u.as_slice())
    }

    /// Native interval bounds at row `index`, if the backend produced them.
    pub fn interval_at(&self, index: usize) -> Option<(f64, f64)> {
        self.interval
            .as_ref()
            .and_then(|(l, u)| Some((*l.get(index)?, *u.get(index)?)))
    }

    /// Index of the first non-finite point estimate.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.point.iter().position(|v| !v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_without_intervals() {
        let p = Prediction::from_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.len(), 3);
        assert!(!p.is_empty());
        assert!(!p.has_intervals());
        assert!(p.lower().is_none());
        assert_eq!(p.interval_at(0), None);
    }

    #[test]
    fn prediction_with_intervals_exposes_bounds() {
        let p = Prediction::from_values_with_intervals(
            vec![1.0, 2.0],
            vec![0.5, 1.5],
            vec![1.5, 2.5],
        )
        .unwrap();
        assert!(p.has_intervals());
        assert_eq!(p.interval_at(1), Some((1.5, 2.5)));
        assert_eq!(p.interval_at(2), None);
        assert_eq!(p.upper().unwrap(), &[1.5, 2.5]);
    }

    #[test]
    fn prediction_rejects_mismatched_interval_lengths() {
        let result = Prediction::from_values_with_intervals(vec![1.0, 2.0], vec![0.5], vec![1.5, 2.5]);
        assert_eq!(
            result,
            Err(PipelineError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn first_non_finite_finds_nan_and_infinity() {
        assert_eq!(Prediction::from_values(vec![1.0, 2.0]).first_non_finite(), None);
        assert_eq!(
            Prediction::from_values(vec![1.0, f64::NAN]).first_non_finite(),
            Some(1)
        );
        assert_eq!(
            Prediction::from_values(vec![f64::INFINITY]).first_non_finite(),
            Some(0)
        );
    }
}

//! Train / test / future-horizon partition of a series.

use crate::core::observation::{validate_ordering, Observation};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Contiguous training window, testing window strictly after it, and an
/// optional future horizon strictly after the testing window.
///
/// Training and testing rows always carry finite observed values. Timestamps are
/// strictly increasing within and across windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SplitWindows", into = "SplitWindows")]
pub struct Split {
    training: Vec<Observation>,
    testing: Vec<Observation>,
    horizon: Vec<Observation>,
}

#[derive(Serialize, Deserialize)]
struct SplitWindows {
    training: Vec<Observation>,
    testing: Vec<Observation>,
    #[serde(default)]
    horizon: Vec<Observation>,
}

impl TryFrom<SplitWindows> for Split {
    type Error = PipelineError;

    fn try_from(windows: SplitWindows) -> Result<Self> {
        Split::new(windows.training, windows.testing, windows.horizon)
    }
}

impl From<Split> for SplitWindows {
    fn from(split: Split) -> Self {
        Self {
            training: split.training,
            testing: split.testing,
            horizon: split.horizon,
        }
    }
}

impl Split {
    /// Create a split, validating window contents and ordering.
    pub fn new(
        training: Vec<Observation>,
        testing: Vec<Observation>,
        horizon: Vec<Observation>,
    ) -> Result<Self> {
        if training.is_empty() || testing.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        for row in training.iter().chain(testing.iter()) {
            let value = row.actual()?;
            if !value.is_finite() {
                return Err(PipelineError::InvalidParameter(format!(
                    "non-finite value {} at {}",
                    value, row.timestamp
                )));
            }
        }

        validate_ordering(&training)?;
        validate_ordering(&testing)?;
        validate_ordering(&horizon)?;
        ensure_after(&training, &testing, "testing window")?;
        ensure_after(&testing, &horizon, "future horizon")?;

        Ok(Self {
            training,
            testing,
            horizon,
        })
    }

    /// Split an observed dataset so its last `assess` rows form the testing window.
    pub fn from_tail(
        dataset: &[Observation],
        assess: usize,
        horizon: Vec<Observation>,
    ) -> Result<Self> {
        if assess == 0 {
            return Err(PipelineError::InvalidParameter(
                "testing window must contain at least one row".to_string(),
            ));
        }
        if dataset.len() <= assess {
            return Err(PipelineError::InsufficientData {
                needed: assess + 1,
                got: dataset.len(),
            });
        }
        let cut = dataset.len() - assess;
        Self::new(dataset[..cut].to_vec(), dataset[cut..].to_vec(), horizon)
    }

    pub fn training(&self) -> &[Observation] {
        &self.training
    }

    pub fn testing(&self) -> &[Observation] {
        &self.testing
    }

    pub fn horizon(&self) -> &[Observation] {
        &self.horizon
    }

    /// Training followed by testing rows: the expanded dataset used for refits.
    pub fn full(&self) -> Vec<Observation> {
        let mut rows = Vec::with_capacity(self.training.len() + self.testing.len());
        rows.extend_from_slice(&self.training);
        rows.extend_from_slice(&self.testing);
        rows
    }
}

fn ensure_after(earlier: &[Observation], later: &[Observation], name: &str) -> Result<()> {
    if let (Some(last), Some(first)) = (earlier.last(), later.first()) {
        if first.timestamp <= last.timestamp {
            return Err(PipelineError::TimestampError(format!(
                "{} starts at {} which is not after {}",
                name, first.timestamp, last.timestamp
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    fn rows(range: std::ops::Range<i64>) -> Vec<Observation> {
        range.map(|i| Observation::new(day(i), i as f64)).collect()
    }

    #[test]
    fn split_accepts_contiguous_windows() {
        let horizon = (10..13).map(|i| Observation::unobserved(day(i))).collect();
        let split = Split::new(rows(0..7), rows(7..10), horizon).unwrap();

        assert_eq!(split.training().len(), 7);
        assert_eq!(split.testing().len(), 3);
        assert_eq!(split.horizon().len(), 3);
        assert_eq!(split.full().len(), 10);
        assert_eq!(split.full()[7].timestamp, day(7));
    }

    #[test]
    fn split_rejects_overlapping_windows() {
        let result = Split::new(rows(0..7), rows(6..10), vec![]);
        assert!(matches!(result, Err(PipelineError::TimestampError(_))));

        let horizon = vec![Observation::unobserved(day(9))];
        let result = Split::new(rows(0..7), rows(7..10), horizon);
        assert!(matches!(result, Err(PipelineError::TimestampError(_))));
    }

    #[test]
    fn split_requires_observed_training_and_testing_rows() {
        let mut testing = rows(7..10);
        testing[1].value = None;
        assert_eq!(
            Split::new(rows(0..7), testing, vec![]),
            Err(PipelineError::MissingActual(day(8)))
        );
    }

    #[test]
    fn split_rejects_non_finite_values() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut training = rows(0..7);
            training[3].value = Some(bad);
            assert!(matches!(
                Split::new(training, rows(7..10), vec![]),
                Err(PipelineError::InvalidParameter(_))
            ));

            let mut testing = rows(7..10);
            testing[0].value = Some(bad);
            assert!(matches!(
                Split::new(rows(0..7), testing, vec![]),
                Err(PipelineError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn split_rejects_empty_windows() {
        assert_eq!(
            Split::new(vec![], rows(0..3), vec![]),
            Err(PipelineError::EmptyData)
        );
        assert_eq!(
            Split::new(rows(0..3), vec![], vec![]),
            Err(PipelineError::EmptyData)
        );
    }

    #[test]
    fn from_tail_holds_out_the_last_rows() {
        let split = Split::from_tail(&rows(0..24), 12, vec![]).unwrap();
        assert_eq!(split.training().len(), 12);
        assert_eq!(split.testing().len(), 12);
        assert_eq!(split.testing()[0].timestamp, day(12));

        assert!(matches!(
            Split::from_tail(&rows(0..5), 5, vec![]),
            Err(PipelineError::InsufficientData { needed: 6, got: 5 })
        ));
        assert!(Split::from_tail(&rows(0..5), 0, vec![]).is_err());
    }

    #[test]
    fn split_deserialization_validates_windows() {
        let split = Split::new(rows(0..3), rows(3..5), vec![]).unwrap();
        let json = serde_json::to_string(&split).unwrap();
        let back: Split = serde_json::from_str(&json).unwrap();
        assert_eq!(back, split);

        let bad = Split::new(rows(3..5), rows(5..6), vec![]).unwrap();
        let mut value = serde_json::to_value(&bad).unwrap();
        value["testing"] = serde_json::to_value(rows(0..1)).unwrap();
        assert!(serde_json::from_value::<Split>(value).is_err());
    }
}

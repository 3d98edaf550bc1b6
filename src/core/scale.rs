use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale on which forecast values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Values after the preprocessing transform chain (the modeling scale).
    Transformed,
    /// Values on the original revenue scale.
    Original,
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Transformed => f.write_str("transformed"),
            Scale::Original => f.write_str("original"),
        }
    }
}

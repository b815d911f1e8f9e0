use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The five named aura dimensions a group rating can be broken down into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Presence,
    Humor,
    Composure,
    Generosity,
    Consistency,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Presence,
        Dimension::Humor,
        Dimension::Composure,
        Dimension::Generosity,
        Dimension::Consistency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presence => "presence",
            Self::Humor => "humor",
            Self::Composure => "composure",
            Self::Generosity => "generosity",
            Self::Consistency => "consistency",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-dimension sub-scores attached to a rating. BTreeMap keeps
/// serialization order stable.
pub type DimensionScores = BTreeMap<Dimension, i64>;

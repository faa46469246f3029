//! Core types for game situations, model names, and class labels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current game situation a recommendation is requested for.
///
/// Built fresh for every request and never mutated. Values outside their
/// nominal ranges (e.g. overtime as quarter 5) are carried through as-is;
/// the feature transformer decides what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SituationInput {
    /// Down, nominally 1 to 4
    pub down: i32,

    /// Yards needed for a first down
    pub yards_to_go: i32,

    /// Yards from the opponent's goal line (0-100)
    pub field_position: i32,

    /// Quarter, 5 meaning overtime
    pub quarter: i32,

    /// Offense score minus defense score
    pub score_differential: i32,

    /// Seconds left in the current quarter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining_in_quarter: Option<i32>,
}

impl SituationInput {
    /// Create a situation without a game clock reading
    pub fn new(
        down: i32,
        yards_to_go: i32,
        field_position: i32,
        quarter: i32,
        score_differential: i32,
    ) -> Self {
        Self {
            down,
            yards_to_go,
            field_position,
            quarter,
            score_differential,
            seconds_remaining_in_quarter: None,
        }
    }

    /// Attach the seconds remaining in the quarter
    pub fn with_seconds_remaining(mut self, seconds: i32) -> Self {
        self.seconds_remaining_in_quarter = Some(seconds);
        self
    }
}

/// The four logical models the service knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelName {
    /// Offensive play-type model (pass/run)
    Offense,
    /// Defensive pressure model
    Pressure,
    /// Defensive coverage model
    Coverage,
    /// Defensive front model
    Front,
}

impl ModelName {
    /// Every logical model, in registry load order
    pub const ALL: [ModelName; 4] = [
        ModelName::Offense,
        ModelName::Pressure,
        ModelName::Coverage,
        ModelName::Front,
    ];

    /// The three disciplines that make up a defensive call
    pub const DEFENSIVE: [ModelName; 3] =
        [ModelName::Pressure, ModelName::Coverage, ModelName::Front];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offense => "offense",
            Self::Pressure => "pressure",
            Self::Coverage => "coverage",
            Self::Front => "front",
        }
    }

    /// Position in [`ModelName::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Self::Offense => 0,
            Self::Pressure => 1,
            Self::Coverage => 2,
            Self::Front => 3,
        }
    }

    /// Whether this model is one of the defensive disciplines
    pub fn is_defensive(&self) -> bool {
        !matches!(self, Self::Offense)
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offense" => Ok(Self::Offense),
            "pressure" => Ok(Self::Pressure),
            "coverage" => Ok(Self::Coverage),
            "front" => Ok(Self::Front),
            other => Err(format!("unknown model '{}'", other)),
        }
    }
}

/// Class label predicted by a model.
///
/// Training pipelines emit integer classes for binary targets (pressure)
/// and string classes for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

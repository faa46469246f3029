//! Feature engineering for play-calling models.
//!
//! Reproduces the training-time column derivation exactly. The column
//! names and their order are fixed per family; models reject any vector
//! whose layout differs from the one they were trained on.

use playcaller_core::{ModelName, SituationInput};
use serde::Serialize;

/// Offense columns, in training order
pub const OFFENSE_FEATURES: [&str; 9] = [
    "down",
    "yardsToGo",
    "quarter",
    "fieldPosition",
    "redZone",
    "shortYardage",
    "thirdAndLong",
    "firstHalf",
    "scoreDifferential",
];

/// Defense columns, in training order
pub const DEFENSE_FEATURES: [&str; 6] = [
    "down",
    "yardsToGo",
    "fieldPosition",
    "quarter",
    "scoreDifferential",
    "secondsRemainingInQuarter",
];

/// Offense columns as named by the training pipeline, same order as [`OFFENSE_FEATURES`]
pub const OFFENSE_TRAINING_COLUMNS: [&str; 9] = [
    "down",
    "ydstogo",
    "qtr",
    "yrdline100",
    "red_zone",
    "short_yard",
    "third_long",
    "half",
    "ScoreDiff",
];

/// Defense columns as named by the training pipeline, same order as [`DEFENSE_FEATURES`]
pub const DEFENSE_TRAINING_COLUMNS: [&str; 6] = [
    "down",
    "ydstogo",
    "yardline_100",
    "qtr",
    "score_differential",
    "quarter_seconds_remaining",
];

/// Last yard line (inclusive) counted as red zone
const RED_ZONE_YARDS: i32 = 20;

/// Longest distance (inclusive) counted as short yardage
const SHORT_YARDAGE_YARDS: i32 = 2;

/// Shortest third-down distance (inclusive) counted as long
const THIRD_AND_LONG_YARDS: i32 = 8;

/// Fixed feature-derivation recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFamily {
    Offense,
    Defense,
}

impl FeatureFamily {
    /// The family a logical model was trained with
    pub fn for_model(model: ModelName) -> Self {
        if model.is_defensive() {
            Self::Defense
        } else {
            Self::Offense
        }
    }

    /// Column names in output order
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Self::Offense => &OFFENSE_FEATURES,
            Self::Defense => &DEFENSE_FEATURES,
        }
    }

    /// Column names as recorded in exported training artifacts
    pub fn training_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Offense => &OFFENSE_TRAINING_COLUMNS,
            Self::Defense => &DEFENSE_TRAINING_COLUMNS,
        }
    }

    /// Whether `columns` names this family's layout, under either naming
    pub fn matches_columns(&self, columns: &[String]) -> bool {
        let same = |names: &[&str]| {
            names.len() == columns.len() && names.iter().zip(columns).all(|(n, c)| n == c)
        };
        same(self.feature_names()) || same(self.training_columns())
    }

    /// Number of columns this family produces
    pub fn arity(&self) -> usize {
        self.feature_names().len()
    }
}

/// Ordered, named feature values for one situation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    family: FeatureFamily,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn family(&self) -> FeatureFamily {
        self.family
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.family.feature_names()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names()
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    /// Iterate `(name, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.names().iter().copied().zip(self.values.iter().copied())
    }
}

/// Build the feature vector for `input` using the given family's recipe.
///
/// Pure and total: every input produces a vector, and the same input always
/// produces the same vector.
pub fn transform(input: &SituationInput, family: FeatureFamily) -> FeatureVector {
    let values = match family {
        FeatureFamily::Offense => offense_values(input),
        FeatureFamily::Defense => defense_values(input),
    };

    FeatureVector { family, values }
}

fn offense_values(input: &SituationInput) -> Vec<f64> {
    let red_zone = input.field_position <= RED_ZONE_YARDS;
    let short_yardage = input.yards_to_go <= SHORT_YARDAGE_YARDS;
    let third_and_long = input.down == 3 && input.yards_to_go >= THIRD_AND_LONG_YARDS;
    // Overtime (5) and anything else outside 1-2 is second half.
    let first_half = matches!(input.quarter, 1 | 2);

    vec![
        f64::from(input.down),
        f64::from(input.yards_to_go),
        f64::from(input.quarter),
        f64::from(input.field_position),
        flag(red_zone),
        flag(short_yardage),
        flag(third_and_long),
        flag(first_half),
        f64::from(input.score_differential),
    ]
}

fn defense_values(input: &SituationInput) -> Vec<f64> {
    vec![
        f64::from(input.down),
        f64::from(input.yards_to_go),
        f64::from(input.field_position),
        f64::from(input.quarter),
        f64::from(input.score_differential),
        f64::from(input.seconds_remaining_in_quarter.unwrap_or(0)),
    ]
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

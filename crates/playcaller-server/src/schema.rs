//! Request parsing and response shapes for the prediction routes

use axum::extract::rejection::JsonRejection;
use axum::Json;
use playcaller_core::{Label, SituationInput};
use playcaller_models::{DefensiveRecommendation, FeatureFamily, Prediction};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ApiError, FieldError};

/// A situational field with the names it is accepted under.
/// The first name is the one reported back in errors.
struct FieldSpec {
    names: &'static [&'static str],
}

const DOWN: FieldSpec = FieldSpec { names: &["down"] };
const YARDS_TO_GO: FieldSpec = FieldSpec {
    names: &["yardsToGo", "ydstogo"],
};
const FIELD_POSITION: FieldSpec = FieldSpec {
    names: &["fieldPosition", "yrdline100", "yardline_100"],
};
const QUARTER: FieldSpec = FieldSpec {
    names: &["quarter", "qtr"],
};
const SCORE_DIFFERENTIAL: FieldSpec = FieldSpec {
    names: &["scoreDifferential", "ScoreDiff", "score_differential"],
};
const SECONDS_REMAINING: FieldSpec = FieldSpec {
    names: &["secondsRemainingInQuarter", "quarter_seconds_remaining"],
};

impl FieldSpec {
    fn name(&self) -> &'static str {
        self.names[0]
    }

    /// Read the field as an i32, recording a problem if it is missing or not integral
    fn read(&self, body: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<i32> {
        let value = self.names.iter().find_map(|n| body.get(*n)).filter(|v| !v.is_null());

        let Some(value) = value else {
            errors.push(FieldError::new(self.name(), "field required"));
            return None;
        };

        match as_i32(value) {
            Some(v) => Some(v),
            None => {
                errors.push(FieldError::new(self.name(), "expected an integer"));
                None
            }
        }
    }
}

/// Accepts JSON integers and numbers with no fractional part
fn as_i32(value: &Value) -> Option<i32> {
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).ok();
    }

    let f = value.as_f64()?;
    if f.fract() != 0.0 || f < i32::MIN as f64 || f > i32::MAX as f64 {
        return None;
    }
    Some(f as i32)
}

/// Parse a situation from a request body.
///
/// Every missing or malformed field is reported, not just the first.
/// Defense requests additionally require the quarter clock.
pub fn parse_situation(
    payload: Result<Json<Value>, JsonRejection>,
    family: FeatureFamily,
) -> Result<SituationInput, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Value::Object(body) = body else {
        return Err(ApiError::BadRequest("request body must be a JSON object".to_string()));
    };

    let mut errors = Vec::new();
    let down = DOWN.read(&body, &mut errors);
    let yards_to_go = YARDS_TO_GO.read(&body, &mut errors);
    let field_position = FIELD_POSITION.read(&body, &mut errors);
    let quarter = QUARTER.read(&body, &mut errors);
    let score_differential = SCORE_DIFFERENTIAL.read(&body, &mut errors);
    let seconds_remaining = match family {
        FeatureFamily::Offense => None,
        FeatureFamily::Defense => SECONDS_REMAINING.read(&body, &mut errors),
    };

    match (down, yards_to_go, field_position, quarter, score_differential) {
        (Some(down), Some(yards_to_go), Some(field_position), Some(quarter), Some(score_differential))
            if errors.is_empty() =>
        {
            let input = SituationInput::new(down, yards_to_go, field_position, quarter, score_differential);
            Ok(match seconds_remaining {
                Some(seconds) => input.with_seconds_remaining(seconds),
                None => input,
            })
        }
        _ => Err(ApiError::InvalidInput(errors)),
    }
}

/// Offensive play call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffenseResponse {
    pub predicted_play: Label,
    pub probabilities: Vec<f64>,
}

impl From<Prediction> for OffenseResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            predicted_play: prediction.label,
            probabilities: prediction.probabilities,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DefenseProbabilities {
    pub pressure: Vec<f64>,
    pub coverage: Vec<f64>,
    pub front: Vec<f64>,
}

/// Combined defensive call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseResponse {
    pub recommended_pressure: Label,
    pub recommended_coverage: Label,
    pub recommended_front: Label,
    pub probabilities: DefenseProbabilities,
}

impl From<DefensiveRecommendation> for DefenseResponse {
    fn from(rec: DefensiveRecommendation) -> Self {
        Self {
            recommended_pressure: rec.pressure.label,
            recommended_coverage: rec.coverage.label,
            recommended_front: rec.front.label,
            probabilities: DefenseProbabilities {
                pressure: rec.pressure.probabilities,
                coverage: rec.coverage.probabilities,
                front: rec.front.probabilities,
            },
        }
    }
}

/// Single-discipline defensive call, e.g. `{"recommendedCoverage": ..., "probabilities": [...]}`
#[derive(Debug)]
pub struct DisciplineResponse {
    pub prediction: Prediction,
}

impl Serialize for DisciplineResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let discipline = self.prediction.model.as_str();
        let mut key = String::with_capacity("recommended".len() + discipline.len());
        key.push_str("recommended");
        let mut chars = discipline.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&key, &self.prediction.label)?;
        map.serialize_entry("probabilities", &self.prediction.probabilities)?;
        map.end()
    }
}

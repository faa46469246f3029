//! Single-model prediction

use crate::classifier::{Prediction, Predictor};
use crate::features::{transform, FeatureFamily, FeatureVector};
use crate::registry::{ModelRegistry, ModelSlot};
use playcaller_core::{Error, ModelName, Result, SituationInput};
use std::time::Instant;
use tracing::{debug, error};

/// Allowed drift of a probability vector's sum away from 1
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Run one model against a feature vector.
///
/// # Errors
///
/// - [`Error::ModelUnavailable`] if the slot failed to load at startup
/// - [`Error::FeatureShapeMismatch`] if the vector's columns differ from the
///   model's training columns
/// - [`Error::InvalidProbabilities`] if the model's output is not a
///   distribution over its classes
pub fn predict(model: ModelName, slot: &ModelSlot, features: &FeatureVector) -> Result<Prediction> {
    let predictor = match slot {
        ModelSlot::Available(loaded) => &loaded.predictor,
        ModelSlot::Unavailable { reason } => return Err(Error::unavailable(model, reason.clone())),
    };

    check_shape(model, predictor.as_ref(), features)?;

    let start = Instant::now();
    let (label, probabilities) = predictor.predict(features.values())?;
    let latency_us = start.elapsed().as_micros() as u64;

    check_probabilities(model, predictor.classes().len(), &probabilities)?;

    let prediction = Prediction {
        model,
        label,
        classes: predictor.classes().to_vec(),
        probabilities,
        latency_us,
    };
    debug!(
        model = %model,
        label = %prediction.label,
        confidence = prediction.confidence(),
        latency_us,
        "Prediction complete"
    );

    Ok(prediction)
}

/// Transform `input` with the model's family and run it
pub fn predict_situation(
    registry: &ModelRegistry,
    model: ModelName,
    input: &SituationInput,
) -> Result<Prediction> {
    let slot = registry.get(model);
    if let ModelSlot::Unavailable { reason } = slot {
        return Err(Error::unavailable(model, reason.clone()));
    }

    let features = transform(input, FeatureFamily::for_model(model));
    predict(model, slot, &features)
}

fn check_shape(model: ModelName, predictor: &dyn Predictor, features: &FeatureVector) -> Result<()> {
    let family = features.family();

    // Artifacts may carry either the training column names or the service's own names
    let matches = match predictor.feature_names() {
        Some(expected) => family.matches_columns(expected),
        None => predictor.n_features() == features.len(),
    };

    if matches {
        return Ok(());
    }

    let expected = predictor
        .feature_names()
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| (0..predictor.n_features()).map(|i| format!("#{}", i)).collect());
    let actual: Vec<String> = family.training_columns().iter().map(|s| s.to_string()).collect();

    error!(
        model = %model,
        ?expected,
        ?actual,
        "Feature layout does not match the model's training columns; check the deployed artifact"
    );

    Err(Error::FeatureShapeMismatch {
        model,
        expected,
        actual,
    })
}

fn check_probabilities(model: ModelName, n_classes: usize, probabilities: &[f64]) -> Result<()> {
    let detail = if probabilities.len() != n_classes {
        Some(format!(
            "{} probabilities for {} classes",
            probabilities.len(),
            n_classes
        ))
    } else if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        Some("probabilities must be finite and non-negative".to_string())
    } else {
        let sum: f64 = probabilities.iter().sum();
        ((sum - 1.0).abs() > PROBABILITY_TOLERANCE).then(|| format!("probabilities sum to {}", sum))
    };

    match detail {
        Some(detail) => {
            error!(model = %model, "Invalid model output: {}", detail);
            Err(Error::InvalidProbabilities { model, detail })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_loader::ModelSource;
    use playcaller_core::Label;

    fn forest(feature_names: &str, classes: &str, leaf: &str) -> String {
        format!(
            r#"{{
                "kind": "random_forest",
                {feature_names},
                "classes": {classes},
                "trees": [{{ "nodes": [
                    {{ "feature": 0, "threshold": 2.5, "left": 1, "right": 2 }},
                    {{ "value": {leaf} }},
                    {{ "value": {leaf} }}
                ] }}]
            }}"#
        )
    }

    fn registry_with(model: ModelName, json: String) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.load(model, &ModelSource::Inline(json));
        registry
    }

    const OFFENSE_NAMES: &str = r#""feature_names": ["down", "yardsToGo", "quarter", "fieldPosition",
        "redZone", "shortYardage", "thirdAndLong", "firstHalf", "scoreDifferential"]"#;

    #[test]
    fn test_offense_prediction() {
        let registry = registry_with(
            ModelName::Offense,
            forest(OFFENSE_NAMES, r#"["pass", "run"]"#, "[6.0, 2.0]"),
        );
        let prediction =
            predict_situation(&registry, ModelName::Offense, &SituationInput::new(3, 9, 35, 2, -3))
                .unwrap();

        assert_eq!(prediction.label, Label::from("pass"));
        assert_eq!(prediction.probabilities, vec![0.75, 0.25]);
        assert_eq!(prediction.classes.len(), prediction.probabilities.len());
    }

    #[test]
    fn test_training_column_names_accepted() {
        let names = r#""feature_names": ["down", "ydstogo", "yardline_100", "qtr",
            "score_differential", "quarter_seconds_remaining"]"#;
        let registry = registry_with(
            ModelName::Front,
            forest(names, r#"["3-man", "4-man"]"#, "[1.0, 3.0]"),
        );
        let input = SituationInput::new(2, 4, 60, 3, 10).with_seconds_remaining(455);

        let prediction = predict_situation(&registry, ModelName::Front, &input).unwrap();
        assert_eq!(prediction.label, Label::from("4-man"));

        let offense_names = r#""feature_names": ["down", "ydstogo", "qtr", "yrdline100",
            "red_zone", "short_yard", "third_long", "half", "ScoreDiff"]"#;
        let registry = registry_with(
            ModelName::Offense,
            forest(offense_names, r#"["pass", "run"]"#, "[1.0, 3.0]"),
        );
        let prediction =
            predict_situation(&registry, ModelName::Offense, &SituationInput::new(3, 9, 35, 2, -3))
                .unwrap();
        assert_eq!(prediction.label, Label::from("run"));
    }

    #[test]
    fn test_unavailable_slot() {
        let registry = ModelRegistry::new();
        let err = predict_situation(&registry, ModelName::Offense, &SituationInput::new(1, 10, 75, 1, 0))
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { model: ModelName::Offense, .. }));
    }

    #[test]
    fn test_reordered_columns_are_a_shape_mismatch() {
        // Same arity as offense, two columns swapped
        let names = r#""feature_names": ["yardsToGo", "down", "quarter", "fieldPosition",
            "redZone", "shortYardage", "thirdAndLong", "firstHalf", "scoreDifferential"]"#;
        let registry = registry_with(ModelName::Offense, forest(names, "[0, 1]", "[1.0, 1.0]"));

        let err = predict_situation(&registry, ModelName::Offense, &SituationInput::new(1, 10, 75, 1, 0))
            .unwrap_err();
        assert!(matches!(err, Error::FeatureShapeMismatch { .. }));
        assert!(err.is_defect());
    }

    #[test]
    fn test_arity_checked_without_names() {
        // Trained on offense arity but registered as a defensive model
        let registry = registry_with(
            ModelName::Front,
            forest(r#""n_features": 9"#, r#"["3-man", "4-man"]"#, "[1.0, 2.0]"),
        );
        let input = SituationInput::new(1, 10, 75, 1, 0).with_seconds_remaining(600);
        let err = predict_situation(&registry, ModelName::Front, &input).unwrap_err();

        match err {
            Error::FeatureShapeMismatch { expected, actual, .. } => {
                assert_eq!(expected.len(), 9);
                assert_eq!(actual.len(), 6);
            }
            other => panic!("expected shape mismatch, got {other}"),
        }
    }

    #[test]
    fn test_check_probabilities() {
        assert!(check_probabilities(ModelName::Front, 2, &[0.4, 0.6]).is_ok());
        assert!(check_probabilities(ModelName::Front, 2, &[0.4, 0.6 + 1e-9]).is_ok());
        assert!(check_probabilities(ModelName::Front, 3, &[0.4, 0.6]).is_err());
        assert!(check_probabilities(ModelName::Front, 2, &[0.5, 0.6]).is_err());
        assert!(check_probabilities(ModelName::Front, 2, &[f64::NAN, 1.0]).is_err());
    }
}

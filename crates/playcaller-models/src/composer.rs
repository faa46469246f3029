//! Defensive call composition.
//!
//! Pressure, coverage and front are trained as three separate models over
//! the same situation columns. A defensive call needs all three, so the
//! composer refuses to answer unless every one of them is loaded.

use crate::classifier::Prediction;
use crate::executor::predict;
use crate::features::{transform, FeatureFamily};
use crate::registry::ModelRegistry;
use playcaller_core::{Error, ModelName, Result, SituationInput};
use serde::Serialize;
use tracing::warn;

/// Combined defensive call
#[derive(Debug, Clone, Serialize)]
pub struct DefensiveRecommendation {
    pub pressure: Prediction,
    pub coverage: Prediction,
    pub front: Prediction,
}

/// Build one defensive recommendation for `input`.
///
/// All three disciplines are looked up before any feature work; if any is
/// unavailable the whole call fails with [`Error::PartialModelUnavailable`]
/// naming every missing model.
pub fn compose_defense(registry: &ModelRegistry, input: &SituationInput) -> Result<DefensiveRecommendation> {
    let [pressure, coverage, front] = ModelName::DEFENSIVE.map(|m| registry.get(m));

    let missing: Vec<ModelName> = ModelName::DEFENSIVE
        .iter()
        .zip([pressure, coverage, front])
        .filter(|(_, slot)| !slot.is_available())
        .map(|(model, _)| *model)
        .collect();

    if !missing.is_empty() {
        warn!(?missing, "Defensive call refused, models not available");
        return Err(Error::PartialModelUnavailable { models: missing });
    }

    let features = transform(input, FeatureFamily::Defense);

    Ok(DefensiveRecommendation {
        pressure: predict(ModelName::Pressure, pressure, &features)?,
        coverage: predict(ModelName::Coverage, coverage, &features)?,
        front: predict(ModelName::Front, front, &features)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_loader::ModelSource;
    use playcaller_core::Label;

    fn constant_model(classes: &str, leaf: &str) -> ModelSource {
        ModelSource::Inline(format!(
            r#"{{
                "kind": "random_forest",
                "feature_names": ["down", "yardsToGo", "fieldPosition", "quarter",
                                  "scoreDifferential", "secondsRemainingInQuarter"],
                "classes": {classes},
                "trees": [{{ "nodes": [ {{ "value": {leaf} }} ] }}]
            }}"#
        ))
    }

    fn full_registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.load(ModelName::Pressure, &constant_model("[0, 1]", "[1.0, 3.0]"));
        registry.load(ModelName::Coverage, &constant_model(r#"["Base", "Cover 1", "Cover 3"]"#, "[1.0, 1.0, 2.0]"));
        registry.load(ModelName::Front, &constant_model(r#"["3-man", "4-man"]"#, "[5.0, 5.0]"));
        registry
    }

    fn situation() -> SituationInput {
        SituationInput::new(3, 7, 42, 4, -4).with_seconds_remaining(120)
    }

    #[test]
    fn test_compose_all_available() {
        let rec = compose_defense(&full_registry(), &situation()).unwrap();

        assert_eq!(rec.pressure.label, Label::Int(1));
        assert_eq!(rec.coverage.label, Label::from("Cover 3"));
        // Tie resolves to the first class
        assert_eq!(rec.front.label, Label::from("3-man"));
        assert_eq!(rec.coverage.probabilities, vec![0.25, 0.25, 0.5]);
    }

    #[test]
    fn test_missing_coverage_fails_whole_call() {
        let mut registry = full_registry();
        registry.mark_unavailable(ModelName::Coverage, "corrupt artifact");

        let err = compose_defense(&registry, &situation()).unwrap_err();
        match err {
            Error::PartialModelUnavailable { models } => {
                assert_eq!(models, vec![ModelName::Coverage])
            }
            other => panic!("expected partial unavailability, got {other}"),
        }
    }

    #[test]
    fn test_every_missing_model_is_named() {
        let mut registry = ModelRegistry::new();
        registry.load(ModelName::Coverage, &constant_model("[0, 1]", "[1.0, 1.0]"));

        let err = compose_defense(&registry, &situation()).unwrap_err();
        assert_eq!(err.missing_models(), vec![ModelName::Pressure, ModelName::Front]);
    }
}

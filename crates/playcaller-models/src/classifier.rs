//! Predictor trait and prediction result types

use playcaller_core::{Error, Label, ModelName, Result};
use serde::Serialize;

/// Trait for every loaded classification model.
///
/// Implementations are immutable once constructed and are shared across
/// request workers, so every method takes `&self`.
pub trait Predictor: Send + Sync {
    /// Class labels, in the model's internal class order
    fn classes(&self) -> &[Label];

    /// Number of input columns the model expects
    fn n_features(&self) -> usize;

    /// Column names recorded at training time, if the artifact carries them
    fn feature_names(&self) -> Option<&[String]>;

    /// Class probabilities for one row, ordered like [`Predictor::classes`]
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Predicted label and class probabilities for one row.
    ///
    /// The default decision rule is arg-max over the probabilities, with
    /// ties going to the class that comes first in the model's ordering.
    fn predict(&self, features: &[f64]) -> Result<(Label, Vec<f64>)> {
        let probabilities = self.predict_proba(features)?;
        let idx = argmax(&probabilities)
            .ok_or_else(|| Error::internal("model returned no class probabilities"))?;
        let label = self
            .classes()
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::internal(format!("class index {} out of range", idx)))?;
        Ok((label, probabilities))
    }

    /// Predicted label for one row
    fn classify(&self, features: &[f64]) -> Result<Label> {
        self.predict(features).map(|(label, _)| label)
    }

    /// `(label, probability)` pairs in the model's class order
    fn class_probabilities(&self, features: &[f64]) -> Result<Vec<(Label, f64)>> {
        let probabilities = self.predict_proba(features)?;
        Ok(self.classes().iter().cloned().zip(probabilities).collect())
    }
}

/// Index of the first maximum; `None` for an empty slice
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Result of running one model against one feature vector
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Model that produced this prediction
    pub model: ModelName,

    /// Predicted class
    pub label: Label,

    /// Class labels, aligned with `probabilities`
    pub classes: Vec<Label>,

    /// Class probabilities in the model's class order
    pub probabilities: Vec<f64>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl Prediction {
    /// Probability assigned to the predicted class
    pub fn confidence(&self) -> f64 {
        self.classes
            .iter()
            .position(|c| *c == self.label)
            .and_then(|idx| self.probabilities.get(idx).copied())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed output, classes deliberately not in probability order
    struct Fixed {
        classes: Vec<Label>,
        probabilities: Vec<f64>,
    }

    impl Predictor for Fixed {
        fn classes(&self) -> &[Label] {
            &self.classes
        }

        fn n_features(&self) -> usize {
            1
        }

        fn feature_names(&self) -> Option<&[String]> {
            None
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
            Ok(self.probabilities.clone())
        }
    }

    fn coverage() -> Fixed {
        Fixed {
            classes: vec![Label::from("Cover 3"), Label::from("Base"), Label::from("Cover 1")],
            probabilities: vec![0.2, 0.5, 0.3],
        }
    }

    #[test]
    fn test_class_probabilities_keep_class_order() {
        let pairs = coverage().class_probabilities(&[0.0]).unwrap();
        assert_eq!(
            pairs,
            vec![
                (Label::from("Cover 3"), 0.2),
                (Label::from("Base"), 0.5),
                (Label::from("Cover 1"), 0.3),
            ]
        );
    }

    #[test]
    fn test_classify_returns_argmax_label() {
        assert_eq!(coverage().classify(&[0.0]).unwrap(), Label::from("Base"));

        let tied = Fixed {
            classes: vec![Label::Int(0), Label::Int(1)],
            probabilities: vec![0.5, 0.5],
        };
        assert_eq!(tied.classify(&[0.0]).unwrap(), Label::Int(0));

        let empty = Fixed {
            classes: vec![Label::Int(0)],
            probabilities: vec![],
        };
        assert!(empty.classify(&[0.0]).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.25, 0.5, 0.25]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_confidence_matches_label() {
        let prediction = Prediction {
            model: ModelName::Offense,
            label: Label::from("run"),
            classes: vec![Label::from("pass"), Label::from("run")],
            probabilities: vec![0.3, 0.7],
            latency_us: 0,
        };
        assert!((prediction.confidence() - 0.7).abs() < 1e-12);
    }
}

//! Error types for Playcaller

use crate::types::ModelName;

/// Result type alias using Playcaller's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Playcaller operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested model failed to load at startup
    #[error("{model} model not available: {reason}")]
    ModelUnavailable { model: ModelName, reason: String },

    /// One or more of the defensive models failed to load at startup
    #[error("defensive models not available: {}", join_models(.models))]
    PartialModelUnavailable { models: Vec<ModelName> },

    /// Feature vector does not match the columns the model was trained on
    #[error(
        "feature shape mismatch for {model} model: expected [{}], got [{}]",
        .expected.join(", "),
        .actual.join(", ")
    )]
    FeatureShapeMismatch {
        model: ModelName,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Model produced a probability vector that is not a distribution over its classes
    #[error("{model} model produced invalid probabilities: {detail}")]
    InvalidProbabilities { model: ModelName, detail: String },

    /// Model artifact could not be read or failed validation
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model-unavailable error
    pub fn unavailable(model: ModelName, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            model,
            reason: reason.into(),
        }
    }

    /// Create a new artifact error
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Models whose absence caused this error, if any
    pub fn missing_models(&self) -> Vec<ModelName> {
        match self {
            Self::ModelUnavailable { model, .. } => vec![*model],
            Self::PartialModelUnavailable { models } => models.clone(),
            _ => Vec::new(),
        }
    }

    /// Whether the error signals a serving defect (training/serving skew)
    /// rather than an expected operational condition
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::FeatureShapeMismatch { .. } | Self::InvalidProbabilities { .. } | Self::Internal(_)
        )
    }
}

fn join_models(models: &[ModelName]) -> String {
    models
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

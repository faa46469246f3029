//! Model artifact loading

use crate::classifier::Predictor;
use crate::forest::{ForestArtifact, RandomForest};
use playcaller_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Source location for a model artifact
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Load from local file system
    LocalPath(PathBuf),

    /// Artifact JSON held in memory
    Inline(String),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path.display()),
            Self::Inline(_) => f.write_str("<inline>"),
        }
    }
}

/// Serialized classifier, tagged by estimator kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(ForestArtifact),
}

impl ModelArtifact {
    /// Validate the artifact and build its predictor
    pub fn into_predictor(self) -> Result<Arc<dyn Predictor>> {
        match self {
            Self::RandomForest(forest) => Ok(Arc::new(RandomForest::from_artifact(forest)?)),
        }
    }
}

/// A predictor together with where it came from
#[derive(Clone)]
pub struct LoadedModel {
    /// The ready-to-serve predictor
    pub predictor: Arc<dyn Predictor>,

    /// Hex SHA-256 of the artifact bytes
    pub fingerprint: String,

    /// Human-readable origin (path or `<inline>`)
    pub origin: String,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("origin", &self.origin)
            .field("fingerprint", &self.fingerprint)
            .field("classes", &self.predictor.classes())
            .finish()
    }
}

impl LoadedModel {
    /// Read, parse and validate an artifact
    pub fn load(source: &ModelSource) -> Result<Self> {
        let bytes = match source {
            ModelSource::LocalPath(path) => std::fs::read(path).map_err(|e| {
                Error::artifact(format!("failed to read {}: {}", path.display(), e))
            })?,
            ModelSource::Inline(json) => json.as_bytes().to_vec(),
        };

        let fingerprint = fingerprint(&bytes);
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| Error::artifact(format!("failed to parse {}: {}", source, e)))?;
        let predictor = artifact.into_predictor()?;

        Ok(Self {
            predictor,
            fingerprint,
            origin: source.to_string(),
        })
    }

    /// Wrap an already-built predictor
    pub fn from_predictor(predictor: Arc<dyn Predictor>, origin: impl Into<String>) -> Self {
        Self {
            predictor,
            fingerprint: String::new(),
            origin: origin.into(),
        }
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESSURE: &str = r#"{
        "kind": "random_forest",
        "n_features": 6,
        "classes": [0, 1],
        "trees": [{ "nodes": [ { "value": [7.0, 3.0] } ] }]
    }"#;

    #[test]
    fn test_load_inline_artifact() {
        let model = LoadedModel::load(&ModelSource::Inline(PRESSURE.to_string())).unwrap();
        assert_eq!(model.origin, "<inline>");
        assert_eq!(model.fingerprint.len(), 64);
        assert_eq!(model.predictor.n_features(), 6);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = LoadedModel::load(&ModelSource::Inline(PRESSURE.to_string())).unwrap();
        let b = LoadedModel::load(&ModelSource::Inline(PRESSURE.to_string())).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{ "kind": "gradient_boosting", "classes": [0, 1], "trees": [] }"#;
        let err = LoadedModel::load(&ModelSource::Inline(json.to_string())).unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
    }

    #[test]
    fn test_missing_file_is_artifact_error() {
        let source = ModelSource::LocalPath(PathBuf::from("/nonexistent/playcall_model.json"));
        let err = LoadedModel::load(&source).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}

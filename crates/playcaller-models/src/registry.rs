//! Model registry initialization and lookup

use crate::classifier::Predictor;
use crate::config::ModelsConfig;
use crate::model_loader::{LoadedModel, ModelSource};
use playcaller_core::{Error, Label, ModelName, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Availability of one logical model
#[derive(Debug, Clone)]
pub enum ModelSlot {
    /// Loaded and ready to serve
    Available(LoadedModel),

    /// Failed to load at startup; stays this way until restart
    Unavailable { reason: String },
}

impl ModelSlot {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    fn unregistered() -> Self {
        Self::Unavailable {
            reason: "model not registered".to_string(),
        }
    }
}

/// Per-model status, as reported by the service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub name: ModelName,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Label>>,
}

/// Registry of the logical models.
///
/// Populated once during startup and read-only afterwards; share it behind
/// an `Arc` and every lookup is a borrow of a fixed slot.
#[derive(Debug)]
pub struct ModelRegistry {
    slots: [ModelSlot; ModelName::ALL.len()],
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| ModelSlot::unregistered()),
        }
    }
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to load every logical model from configuration.
    ///
    /// A failing model is recorded as unavailable and the rest keep loading.
    /// Only when `require_any` is set and nothing loads is this an error.
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        let mut registry = Self::new();

        info!("Loading {} models from {}", ModelName::ALL.len(), config.dir.display());

        for model in ModelName::ALL {
            registry.load(model, &config.source_for(model));
        }

        let loaded = registry.available_count();
        info!("Model registry initialized with {}/{} models", loaded, ModelName::ALL.len());

        if loaded == 0 && config.require_any {
            return Err(Error::config("no models could be loaded and models.require_any is set"));
        }

        Ok(registry)
    }

    /// Load one model into its slot, recording a failure instead of returning it
    pub fn load(&mut self, model: ModelName, source: &ModelSource) -> &ModelSlot {
        let slot = match LoadedModel::load(source) {
            Ok(loaded) => {
                info!(
                    model = %model,
                    classes = loaded.predictor.classes().len(),
                    fingerprint = %loaded.fingerprint,
                    "Loaded model from {}",
                    source
                );
                ModelSlot::Available(loaded)
            }
            Err(e) => {
                warn!(model = %model, "Failed to load model from {}: {}", source, e);
                ModelSlot::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        self.slots[model.index()] = slot;
        &self.slots[model.index()]
    }

    /// Register an already-built predictor
    pub fn register(&mut self, model: ModelName, predictor: Arc<dyn Predictor>) {
        let loaded = LoadedModel::from_predictor(predictor, "<registered>");
        self.slots[model.index()] = ModelSlot::Available(loaded);
    }

    /// Record a model as unavailable
    pub fn mark_unavailable(&mut self, model: ModelName, reason: impl Into<String>) {
        self.slots[model.index()] = ModelSlot::Unavailable {
            reason: reason.into(),
        };
    }

    /// Look up a model. Never fails: models that were never loaded report as unavailable.
    pub fn get(&self, model: ModelName) -> &ModelSlot {
        &self.slots[model.index()]
    }

    pub fn is_available(&self, model: ModelName) -> bool {
        self.get(model).is_available()
    }

    /// Number of loaded models
    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_available()).count()
    }

    /// Status of every logical model, in load order
    pub fn status(&self) -> Vec<ModelStatus> {
        ModelName::ALL
            .iter()
            .map(|&name| match self.get(name) {
                ModelSlot::Available(loaded) => ModelStatus {
                    name,
                    available: true,
                    reason: None,
                    fingerprint: Some(loaded.fingerprint.clone()).filter(|f| !f.is_empty()),
                    classes: Some(loaded.predictor.classes().to_vec()),
                },
                ModelSlot::Unavailable { reason } => ModelStatus {
                    name,
                    available: false,
                    reason: Some(reason.clone()),
                    fingerprint: None,
                    classes: None,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelFiles;

    const OFFENSE: &str = r#"{
        "kind": "random_forest",
        "feature_names": ["down", "yardsToGo", "quarter", "fieldPosition", "redZone",
                          "shortYardage", "thirdAndLong", "firstHalf", "scoreDifferential"],
        "classes": ["pass", "run"],
        "trees": [{ "nodes": [ { "value": [3.0, 1.0] } ] }]
    }"#;

    #[test]
    fn test_one_bad_artifact_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("playcall_model.json"), OFFENSE).unwrap();
        std::fs::write(dir.path().join("def_pressure_model.json"), "not json").unwrap();

        let config = ModelsConfig {
            dir: dir.path().to_path_buf(),
            files: ModelFiles::default(),
            require_any: false,
        };
        let registry = ModelRegistry::from_config(&config).unwrap();

        assert!(registry.is_available(ModelName::Offense));
        assert!(!registry.is_available(ModelName::Pressure));
        assert!(!registry.is_available(ModelName::Coverage));
        assert!(!registry.is_available(ModelName::Front));
        assert_eq!(registry.available_count(), 1);

        match registry.get(ModelName::Pressure) {
            ModelSlot::Unavailable { reason } => assert!(reason.contains("failed to parse")),
            ModelSlot::Available(_) => panic!("corrupt artifact should not load"),
        }
    }

    #[test]
    fn test_require_any_with_nothing_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig {
            dir: dir.path().to_path_buf(),
            files: ModelFiles::default(),
            require_any: true,
        };
        assert!(matches!(ModelRegistry::from_config(&config), Err(Error::Config(_))));

        let lenient = ModelsConfig {
            require_any: false,
            ..config
        };
        let registry = ModelRegistry::from_config(&lenient).unwrap();
        assert_eq!(registry.available_count(), 0);
    }

    #[test]
    fn test_unregistered_model_is_unavailable() {
        let registry = ModelRegistry::new();
        assert!(!registry.get(ModelName::Front).is_available());
        assert_eq!(registry.available_count(), 0);
    }

    #[test]
    fn test_get_borrows_the_stored_slot() {
        let mut registry = ModelRegistry::new();
        registry.load(ModelName::Offense, &ModelSource::Inline(OFFENSE.to_string()));

        for model in ModelName::ALL {
            assert!(std::ptr::eq(registry.get(model), registry.get(model)));
        }
        assert!(!std::ptr::eq(registry.get(ModelName::Pressure), registry.get(ModelName::Front)));
        assert!(registry.is_available(ModelName::Offense));
    }

    #[test]
    fn test_status_lists_all_models() {
        let mut registry = ModelRegistry::new();
        registry.load(ModelName::Offense, &ModelSource::Inline(OFFENSE.to_string()));
        registry.mark_unavailable(ModelName::Coverage, "missing file");

        let status = registry.status();
        assert_eq!(status.len(), 4);
        assert!(status[0].available);
        assert_eq!(status[0].fingerprint.as_ref().map(|f| f.len()), Some(64));
        assert_eq!(status[2].name, ModelName::Coverage);
        assert_eq!(status[2].reason.as_deref(), Some("missing file"));
        assert_eq!(status[3].reason.as_deref(), Some("model not registered"));
    }
}

//! Configuration for model artifact locations

use crate::model_loader::ModelSource;
use playcaller_core::ModelName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the four model artifacts live and how strictly they are required
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding the artifacts
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    /// Artifact file name per logical model
    #[serde(default)]
    pub files: ModelFiles,

    /// Refuse to start when no model loads at all
    #[serde(default)]
    pub require_any: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            files: ModelFiles::default(),
            require_any: false,
        }
    }
}

impl ModelsConfig {
    /// Artifact source for a logical model
    pub fn source_for(&self, model: ModelName) -> ModelSource {
        ModelSource::LocalPath(self.dir.join(self.files.file_for(model)))
    }
}

/// Artifact file names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFiles {
    #[serde(default = "default_offense_file")]
    pub offense: String,

    #[serde(default = "default_pressure_file")]
    pub pressure: String,

    #[serde(default = "default_coverage_file")]
    pub coverage: String,

    #[serde(default = "default_front_file")]
    pub front: String,
}

impl ModelFiles {
    pub fn file_for(&self, model: ModelName) -> &str {
        match model {
            ModelName::Offense => &self.offense,
            ModelName::Pressure => &self.pressure,
            ModelName::Coverage => &self.coverage,
            ModelName::Front => &self.front,
        }
    }
}

impl Default for ModelFiles {
    fn default() -> Self {
        Self {
            offense: default_offense_file(),
            pressure: default_pressure_file(),
            coverage: default_coverage_file(),
            front: default_front_file(),
        }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_offense_file() -> String {
    "playcall_model.json".to_string()
}

fn default_pressure_file() -> String {
    "def_pressure_model.json".to_string()
}

fn default_coverage_file() -> String {
    "def_coverage_model.json".to_string()
}

fn default_front_file() -> String {
    "def_front_model.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_files_keep_defaults() {
        let config: ModelsConfig = serde_json::from_str(
            r#"{ "dir": "/srv/models", "files": { "coverage": "cov_v2.json" } }"#,
        )
        .unwrap();

        assert_eq!(config.files.file_for(ModelName::Coverage), "cov_v2.json");
        assert_eq!(config.files.file_for(ModelName::Front), "def_front_model.json");
        assert!(!config.require_any);

        match config.source_for(ModelName::Offense) {
            ModelSource::LocalPath(path) => {
                assert_eq!(path, PathBuf::from("/srv/models/playcall_model.json"))
            }
            other => panic!("unexpected source {:?}", other),
        }
    }
}

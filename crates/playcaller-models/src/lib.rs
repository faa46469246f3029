//! Playcaller Models
//!
//! Inference orchestration for play-calling recommendations.
//!
//! The flow for every request is the same:
//! - [`features::transform`] rebuilds the training-time columns from a situation
//! - [`ModelRegistry`] hands out the loaded model for a logical name, or reports it unavailable
//! - [`executor::predict`] runs one model; [`composer::compose_defense`] runs all three defensive models
//!
//! Models are loaded once at startup and never replaced while serving.

pub mod classifier;
pub mod composer;
pub mod config;
pub mod executor;
pub mod features;
pub mod forest;
pub mod model_loader;
pub mod registry;

pub use classifier::{argmax, Prediction, Predictor};
pub use composer::{compose_defense, DefensiveRecommendation};
pub use config::{ModelFiles, ModelsConfig};
pub use executor::{predict, predict_situation, PROBABILITY_TOLERANCE};
pub use features::{
    transform, FeatureFamily, FeatureVector, DEFENSE_FEATURES, DEFENSE_TRAINING_COLUMNS, OFFENSE_FEATURES,
    OFFENSE_TRAINING_COLUMNS,
};
pub use forest::{ForestArtifact, RandomForest};
pub use model_loader::{LoadedModel, ModelArtifact, ModelSource};
pub use registry::{ModelRegistry, ModelSlot, ModelStatus};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Prediction, Predictor};
    pub use crate::composer::{compose_defense, DefensiveRecommendation};
    pub use crate::executor::{predict, predict_situation};
    pub use crate::features::{transform, FeatureFamily, FeatureVector};
    pub use crate::registry::{ModelRegistry, ModelSlot};
}

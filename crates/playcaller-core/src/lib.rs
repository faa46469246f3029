//! Playcaller Core
//!
//! Core types and error handling shared across Playcaller components.
//!
//! This crate provides:
//! - The game situation value every prediction starts from
//! - Logical model names and class labels
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Label, ModelName, SituationInput};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Label, ModelName, SituationInput};
}

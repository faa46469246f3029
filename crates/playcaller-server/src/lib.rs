//! Playcaller Server
//!
//! HTTP service for play-calling recommendations. Prediction routes sit
//! behind the access gate; models are loaded once at startup and served
//! from a shared, read-only registry.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod schema;
pub mod state;

pub use access::{AccessDecision, AccessGate, AccessRequest, AccessRule, CredentialVerifier, Identity};
pub use auth::{AuthError, AuthService, User, UserStore};
pub use config::{AppConfig, ConfigOverrides, DatabaseConfig};
pub use error::{ApiError, FieldError};
pub use routes::create_router;
pub use state::AppState;

//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use playcaller_models::ModelRegistry;
use std::sync::Arc;

use crate::access::AccessGate;
use crate::auth::{AuthError, AuthService, UserStore};
use crate::config::AppConfig;

/// State handed to every handler. Cloning is cheap; everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Models loaded at startup, read-only afterwards
    pub registry: Arc<ModelRegistry>,

    pub auth: Arc<AuthService>,

    pub gate: Arc<AccessGate>,

    /// Prometheus handle for rendering `/metrics`; absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Open the account store, then wire up the auth service and the standard
    /// access gate around a loaded registry
    pub fn new(config: AppConfig, registry: ModelRegistry) -> Result<Self, AuthError> {
        let store = UserStore::open(&config.database.url)?;
        let auth = Arc::new(AuthService::new(&config.auth, store));
        let gate = Arc::new(AccessGate::standard(auth.clone()));

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            auth,
            gate,
            metrics_handle: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

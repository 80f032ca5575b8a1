//! Application State
//!
//! Shared state for the Warden API server

use std::sync::Arc;

use crate::config::{AuthConfig, KubernetesConfig, WardenConfig};
use crate::kubernetes::ClusterClientProvider;

/// Shared application state, read-only once the server is running
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ClusterClientProvider>,
    pub kubernetes: KubernetesConfig,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(config: &WardenConfig, provider: Arc<dyn ClusterClientProvider>) -> Self {
        Self {
            provider,
            kubernetes: config.kubernetes.clone(),
            auth: config.auth.clone(),
        }
    }
}

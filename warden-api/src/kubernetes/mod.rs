//! Kubernetes integration for Warden
//!
//! Provides caller-scoped access to role bindings in registered environments:
//! - Environment registry and scoped client provisioning (impersonation)
//! - Role binding listing
//! - Namespace-grouped bulk deletion
//! - HTTP handlers for both operations

pub mod client;
pub mod error;
pub mod handlers;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod provider;
pub mod rbac;

pub use client::{ClusterClient, K8sClient};
pub use error::{ClusterError, K8sError, K8sResult};
pub use provider::{ClusterClientProvider, EnvironmentId, KubeconfigProvider};
pub use rbac::AbsentBindingPolicy;

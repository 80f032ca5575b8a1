//! Kubernetes error types and ApiError mapping
//!
//! Maps kube-rs errors to Warden API errors for consistent error handling.

use super::provider::EnvironmentId;
use crate::error::ApiError;
use thiserror::Error;

/// Error reported by a cluster client for a single API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// Target resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cluster refused the call for the impersonated identity
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Cluster rejected the service credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other status returned by the API server
    #[error("Kubernetes API error ({code} {reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    /// Connection, TLS or decoding failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => ClusterError::NotFound(response.message),
                403 => ClusterError::Forbidden(response.message),
                401 => ClusterError::Unauthorized(response.message),
                code => ClusterError::Api {
                    code,
                    reason: response.reason,
                    message: response.message,
                },
            },
            other => ClusterError::Transport(other.to_string()),
        }
    }
}

impl ClusterError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClusterError::Forbidden(_))
    }
}

/// Result type alias for single cluster calls
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Kubernetes-specific errors
#[derive(Debug, Error)]
pub enum K8sError {
    /// Environment is not registered
    #[error("Environment not found: {0}")]
    EnvironmentNotFound(EnvironmentId),

    /// A client scoped to the caller could not be built
    #[error("Cluster client unavailable: {0}")]
    ClientUnavailable(String),

    /// Caller lacks permission
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Listing role bindings failed; no partial result is returned
    #[error("Unable to fetch role bindings: {0}")]
    FetchFailed(#[source] ClusterError),

    /// Bulk deletion aborted at the first failing binding
    #[error("Failed to delete role binding {namespace}/{name}: {source}")]
    DeleteFailed {
        namespace: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    /// Delete payload failed structural validation
    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),
}

impl From<K8sError> for ApiError {
    fn from(err: K8sError) -> Self {
        match err {
            K8sError::EnvironmentNotFound(id) => ApiError::NotFound(format!(
                "Unable to find an environment with identifier {}",
                id
            )),
            // The cause is logged by the handler, never returned
            K8sError::ClientUnavailable(_) => {
                ApiError::Internal("Unable to prepare kube client".to_string())
            }
            K8sError::Forbidden(msg) => ApiError::Forbidden(msg),
            K8sError::FetchFailed(ClusterError::Forbidden(msg)) => ApiError::Forbidden(msg),
            err @ K8sError::FetchFailed(_) => ApiError::Internal(err.to_string()),
            K8sError::DeleteFailed {
                namespace,
                name,
                source: ClusterError::Forbidden(msg),
            } => ApiError::Forbidden(format!(
                "Not allowed to delete role binding {}/{}: {}",
                namespace, name, msg
            )),
            err @ K8sError::DeleteFailed { .. } => ApiError::Internal(err.to_string()),
            err @ K8sError::InvalidPayload(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Result type alias for Kubernetes operations
pub type K8sResult<T> = std::result::Result<T, K8sError>;

//! Cluster client provisioning
//!
//! Builds a client scoped to the calling user for one environment. The
//! caller and environment are always passed in explicitly.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use warden_common::auth::CallerContext;

use super::client::{ClusterClient, K8sClient};
use super::error::{K8sError, K8sResult};
use crate::config::{EnvironmentConfig, KubeconfigSource};

/// Numeric environment identifier, as used in request paths
pub type EnvironmentId = u32;

/// Produces clients authorized to act on a caller's behalf
#[async_trait]
pub trait ClusterClientProvider: Send + Sync {
    async fn obtain(
        &self,
        caller: &CallerContext,
        environment_id: EnvironmentId,
    ) -> K8sResult<Arc<dyn ClusterClient>>;
}

/// Provider backed by the environments registered in configuration
pub struct KubeconfigProvider {
    environments: HashMap<EnvironmentId, EnvironmentConfig>,
}

impl KubeconfigProvider {
    pub fn new(environments: &[EnvironmentConfig]) -> Self {
        let environments = environments
            .iter()
            .map(|env| (env.id, env.clone()))
            .collect::<HashMap<_, _>>();

        tracing::info!(
            "Kubernetes provider initialized with {} environments",
            environments.len()
        );

        Self { environments }
    }

    /// Look up a registered environment
    pub fn environment(&self, id: EnvironmentId) -> K8sResult<&EnvironmentConfig> {
        self.environments
            .get(&id)
            .ok_or(K8sError::EnvironmentNotFound(id))
    }
}

#[async_trait]
impl ClusterClientProvider for KubeconfigProvider {
    async fn obtain(
        &self,
        caller: &CallerContext,
        environment_id: EnvironmentId,
    ) -> K8sResult<Arc<dyn ClusterClient>> {
        let env = self.environment(environment_id)?;

        if !env.admits(caller) {
            return Err(K8sError::Forbidden(format!(
                "User '{}' may not access environment {}",
                caller.username, environment_id
            )));
        }

        let client = match env.source()? {
            KubeconfigSource::File(path) => {
                let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
                    K8sError::ClientUnavailable(format!(
                        "Failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;

                K8sClient::from_kubeconfig(
                    &yaml,
                    env.context.as_deref(),
                    environment_id,
                    env.name.clone(),
                    caller,
                )
                .await?
            }
            KubeconfigSource::InCluster => {
                K8sClient::from_incluster(environment_id, env.name.clone(), caller).await?
            }
        };

        tracing::debug!(
            environment_id,
            environment = client.environment_name(),
            api_server = client.api_server(),
            user = %caller.username,
            "Prepared scoped kube client"
        );

        Ok(Arc::new(client))
    }
}

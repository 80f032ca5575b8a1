//! Kubernetes client wrapper
//!
//! Wraps the kube-rs Client with environment context and exposes the role
//! binding calls Warden needs through the [`ClusterClient`] capability.

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::api::{Api, DeleteParams, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use warden_common::auth::CallerContext;

use super::error::{ClusterResult, K8sError, K8sResult};
use super::provider::EnvironmentId;

/// A client bound to one (caller, environment) pair.
///
/// Implementations never hold more authority than the caller they were
/// built for. They live for a single request.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Environment this client talks to
    fn environment_id(&self) -> EnvironmentId;

    /// List role bindings in `namespace`, or in every namespace when `None`
    async fn list_role_bindings(&self, namespace: Option<&str>) -> ClusterResult<Vec<RoleBinding>>;

    /// Delete a single role binding
    async fn delete_role_binding(&self, namespace: &str, name: &str) -> ClusterResult<()>;
}

/// Wrapper around kube-rs Client with environment context
#[derive(Clone)]
pub struct K8sClient {
    inner: Client,
    environment_id: EnvironmentId,
    environment_name: String,
    api_server: String,
    impersonating: String,
}

impl K8sClient {
    /// Create client from kubeconfig YAML with optional context, acting as `caller`
    pub async fn from_kubeconfig(
        kubeconfig_yaml: &str,
        context: Option<&str>,
        environment_id: EnvironmentId,
        environment_name: String,
        caller: &CallerContext,
    ) -> K8sResult<Self> {
        let kubeconfig = Kubeconfig::from_yaml(kubeconfig_yaml).map_err(|e| {
            K8sError::ClientUnavailable(format!("Failed to parse kubeconfig: {}", e))
        })?;

        let api_server = Self::extract_api_server(&kubeconfig, context)?;

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(String::from),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| K8sError::ClientUnavailable(format!("Failed to create config: {}", e)))?;

        impersonate(&mut config, caller);

        Self::from_config(config, environment_id, environment_name, api_server, caller)
    }

    /// Create client from in-cluster configuration (for running inside K8s)
    pub async fn from_incluster(
        environment_id: EnvironmentId,
        environment_name: String,
        caller: &CallerContext,
    ) -> K8sResult<Self> {
        let mut config = Config::incluster().map_err(|e| {
            K8sError::ClientUnavailable(format!("Failed to get in-cluster config: {}", e))
        })?;

        let api_server = config.cluster_url.to_string();
        impersonate(&mut config, caller);

        Self::from_config(config, environment_id, environment_name, api_server, caller)
    }

    fn from_config(
        config: Config,
        environment_id: EnvironmentId,
        environment_name: String,
        api_server: String,
        caller: &CallerContext,
    ) -> K8sResult<Self> {
        let client = Client::try_from(config)
            .map_err(|e| K8sError::ClientUnavailable(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            inner: client,
            environment_id,
            environment_name,
            api_server,
            impersonating: caller.username.clone(),
        })
    }

    /// Extract API server URL from kubeconfig
    fn extract_api_server(kubeconfig: &Kubeconfig, context_name: Option<&str>) -> K8sResult<String> {
        let context_name = context_name
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| {
                K8sError::ClientUnavailable("No context specified and no current-context".into())
            })?;

        let context = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| {
                K8sError::ClientUnavailable(format!("Context '{}' not found", context_name))
            })?;

        let cluster_name = context
            .context
            .as_ref()
            .map(|c| c.cluster.as_str())
            .ok_or_else(|| {
                K8sError::ClientUnavailable("Context has no cluster reference".into())
            })?;

        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == cluster_name)
            .ok_or_else(|| {
                K8sError::ClientUnavailable(format!("Cluster '{}' not found", cluster_name))
            })?;

        cluster
            .cluster
            .as_ref()
            .and_then(|c| c.server.clone())
            .ok_or_else(|| K8sError::ClientUnavailable("Cluster has no server URL".into()))
    }

    fn role_bindings(&self, namespace: Option<&str>) -> Api<RoleBinding> {
        match namespace {
            Some(ns) => Api::namespaced(self.inner.clone(), ns),
            None => Api::all(self.inner.clone()),
        }
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn api_server(&self) -> &str {
        &self.api_server
    }
}

#[async_trait]
impl ClusterClient for K8sClient {
    fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    async fn list_role_bindings(&self, namespace: Option<&str>) -> ClusterResult<Vec<RoleBinding>> {
        let list = self
            .role_bindings(namespace)
            .list(&ListParams::default())
            .await?;

        Ok(list.items)
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        self.role_bindings(Some(namespace))
            .delete(name, &DeleteParams::default())
            .await?;

        Ok(())
    }
}

impl std::fmt::Debug for K8sClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8sClient")
            .field("environment_id", &self.environment_id)
            .field("environment_name", &self.environment_name)
            .field("api_server", &self.api_server)
            .field("impersonating", &self.impersonating)
            .finish()
    }
}

/// Scope a client configuration to the caller's identity.
///
/// The service account behind `config` only needs the `impersonate` verb;
/// every other permission is evaluated by the cluster against the caller.
pub(crate) fn impersonate(config: &mut Config, caller: &CallerContext) {
    config.auth_info.impersonate = Some(caller.username.clone());
    config.auth_info.impersonate_groups = if caller.groups.is_empty() {
        None
    } else {
        Some(caller.groups.clone())
    };
}

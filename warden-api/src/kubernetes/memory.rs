//! In-memory cluster backend
//!
//! Holds role bindings in process so handlers and batch logic can run
//! without an API server. Failures can be injected per call, and every
//! delete attempt is recorded in order.

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_common::auth::CallerContext;

use super::client::ClusterClient;
use super::error::{ClusterError, ClusterResult, K8sError, K8sResult};
use super::provider::{ClusterClientProvider, EnvironmentId};

/// Role bindings for one environment, kept in insertion order
pub struct InMemoryCluster {
    environment_id: EnvironmentId,
    bindings: RwLock<Vec<RoleBinding>>,
    list_failure: RwLock<Option<ClusterError>>,
    delete_failures: RwLock<HashMap<(String, String), ClusterError>>,
    delete_attempts: RwLock<Vec<String>>,
}

impl InMemoryCluster {
    pub fn new(environment_id: EnvironmentId) -> Self {
        Self {
            environment_id,
            bindings: RwLock::new(Vec::new()),
            list_failure: RwLock::new(None),
            delete_failures: RwLock::new(HashMap::new()),
            delete_attempts: RwLock::new(Vec::new()),
        }
    }

    pub fn with_binding(mut self, namespace: &str, name: &str, role: &str) -> Self {
        self.bindings
            .get_mut()
            .push(build_binding(namespace, name, role));
        self
    }

    /// Make every subsequent list call fail with `err`
    pub async fn fail_list(&self, err: ClusterError) {
        *self.list_failure.write().await = Some(err);
    }

    /// Make deletes of `namespace/name` fail with `err`
    pub async fn fail_delete(&self, namespace: &str, name: &str, err: ClusterError) {
        self.delete_failures
            .write()
            .await
            .insert((namespace.to_string(), name.to_string()), err);
    }

    pub async fn contains(&self, namespace: &str, name: &str) -> bool {
        self.bindings
            .read()
            .await
            .iter()
            .any(|b| matches_binding(b, namespace, name))
    }

    /// Names of the bindings currently present in `namespace`
    pub async fn names(&self, namespace: &str) -> Vec<String> {
        self.bindings
            .read()
            .await
            .iter()
            .filter(|b| b.metadata.namespace.as_deref() == Some(namespace))
            .filter_map(|b| b.metadata.name.clone())
            .collect()
    }

    /// Every delete attempt so far, as `namespace/name`
    pub async fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.read().await.clone()
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    async fn list_role_bindings(&self, namespace: Option<&str>) -> ClusterResult<Vec<RoleBinding>> {
        if let Some(err) = self.list_failure.read().await.clone() {
            return Err(err);
        }

        Ok(self
            .bindings
            .read()
            .await
            .iter()
            .filter(|b| namespace.is_none() || b.metadata.namespace.as_deref() == namespace)
            .cloned()
            .collect())
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        self.delete_attempts
            .write()
            .await
            .push(format!("{}/{}", namespace, name));

        if let Some(err) = self
            .delete_failures
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
        {
            return Err(err.clone());
        }

        let mut bindings = self.bindings.write().await;
        match bindings.iter().position(|b| matches_binding(b, namespace, name)) {
            Some(index) => {
                bindings.remove(index);
                Ok(())
            }
            None => Err(ClusterError::NotFound(format!(
                "rolebindings.rbac.authorization.k8s.io \"{}\" not found",
                name
            ))),
        }
    }
}

/// View of an [`InMemoryCluster`] restricted to the namespaces a caller
/// was granted
struct ScopedCluster {
    cluster: Arc<InMemoryCluster>,
    username: String,
    allowed: Option<HashSet<String>>,
}

impl ScopedCluster {
    fn permits(&self, namespace: &str) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(namespace))
    }

    fn forbidden(&self, verb: &str, namespace: &str) -> ClusterError {
        ClusterError::Forbidden(format!(
            "User \"{}\" cannot {} resource \"rolebindings\" in API group \"rbac.authorization.k8s.io\" in the namespace \"{}\"",
            self.username, verb, namespace
        ))
    }
}

#[async_trait]
impl ClusterClient for ScopedCluster {
    fn environment_id(&self) -> EnvironmentId {
        self.cluster.environment_id
    }

    async fn list_role_bindings(&self, namespace: Option<&str>) -> ClusterResult<Vec<RoleBinding>> {
        if let Some(ns) = namespace {
            if !self.permits(ns) {
                return Err(self.forbidden("list", ns));
            }
        }

        let bindings = self.cluster.list_role_bindings(namespace).await?;
        Ok(bindings
            .into_iter()
            .filter(|b| self.permits(b.metadata.namespace.as_deref().unwrap_or_default()))
            .collect())
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        if !self.permits(namespace) {
            return Err(self.forbidden("delete", namespace));
        }
        self.cluster.delete_role_binding(namespace, name).await
    }
}

/// Provider handing out scoped views of in-memory clusters.
///
/// Callers without a grant see every namespace. A grant with no
/// namespaces denies the environment outright.
#[derive(Default)]
pub struct InMemoryProvider {
    clusters: HashMap<EnvironmentId, Arc<InMemoryCluster>>,
    unreachable: HashSet<EnvironmentId>,
    grants: HashMap<String, HashSet<String>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, cluster: Arc<InMemoryCluster>) -> Self {
        self.clusters.insert(cluster.environment_id, cluster);
        self
    }

    /// Register an environment whose clients can never be built
    pub fn with_unreachable(mut self, environment_id: EnvironmentId) -> Self {
        self.unreachable.insert(environment_id);
        self
    }

    /// Restrict `username` to the given namespaces
    pub fn with_grant<I, S>(mut self, username: &str, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants.insert(
            username.to_string(),
            namespaces.into_iter().map(Into::into).collect(),
        );
        self
    }
}

#[async_trait]
impl ClusterClientProvider for InMemoryProvider {
    async fn obtain(
        &self,
        caller: &CallerContext,
        environment_id: EnvironmentId,
    ) -> K8sResult<Arc<dyn ClusterClient>> {
        if self.unreachable.contains(&environment_id) {
            return Err(K8sError::ClientUnavailable(format!(
                "environment {} is unreachable",
                environment_id
            )));
        }

        let cluster = self
            .clusters
            .get(&environment_id)
            .cloned()
            .ok_or(K8sError::EnvironmentNotFound(environment_id))?;

        let allowed = self.grants.get(&caller.username).cloned();
        if allowed.as_ref().is_some_and(HashSet::is_empty) {
            return Err(K8sError::Forbidden(format!(
                "User '{}' may not access environment {}",
                caller.username, environment_id
            )));
        }

        Ok(Arc::new(ScopedCluster {
            cluster,
            username: caller.username.clone(),
            allowed,
        }))
    }
}

fn matches_binding(binding: &RoleBinding, namespace: &str, name: &str) -> bool {
    binding.metadata.namespace.as_deref() == Some(namespace)
        && binding.metadata.name.as_deref() == Some(name)
}

fn build_binding(namespace: &str, name: &str, role: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: role.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "Group".to_string(),
            name: format!("{}:{}", namespace, role),
            namespace: None,
            api_group: Some("rbac.authorization.k8s.io".to_string()),
        }]),
    }
}

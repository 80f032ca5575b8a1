//! RoleBinding operations
//!
//! Listing and bulk deletion of namespace-scoped role bindings through a
//! caller-scoped [`ClusterClient`].

use serde::{Deserialize, Serialize};
use warden_common::rbac::{DeleteRequestBatch, RoleBinding, RoleRef, Subject};

use super::client::ClusterClient;
use super::error::{ClusterError, K8sError, K8sResult};

/// How a delete of a binding that no longer exists is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentBindingPolicy {
    /// Already absent counts as deleted
    #[default]
    Ignore,
    /// Already absent aborts the batch like any other failure
    Fail,
}

/// List RoleBindings visible to the client.
///
/// An empty `namespace_filter` lists every namespace. The cluster's order
/// is kept and a failure never yields a partial list.
pub async fn list_role_bindings(
    client: &dyn ClusterClient,
    namespace_filter: &str,
    system_namespaces: &[String],
) -> K8sResult<Vec<RoleBinding>> {
    let namespace = (!namespace_filter.is_empty()).then_some(namespace_filter);

    let items = client
        .list_role_bindings(namespace)
        .await
        .map_err(K8sError::FetchFailed)?;

    Ok(items
        .into_iter()
        .map(|binding| role_binding_to_info(binding, system_namespaces))
        .collect())
}

/// Delete every binding in `batch`, one at a time, in payload order.
///
/// The first failure aborts the batch. Bindings deleted before it stay
/// deleted and bindings after it are never attempted.
pub async fn delete_role_bindings(
    client: &dyn ClusterClient,
    batch: &DeleteRequestBatch,
    policy: AbsentBindingPolicy,
) -> K8sResult<()> {
    let targets = batch.targets();

    tracing::info!(
        environment_id = client.environment_id(),
        namespaces = batch.namespace_count(),
        bindings = targets.len(),
        "Deleting role bindings"
    );

    for (index, target) in targets.iter().enumerate() {
        tracing::debug!(
            namespace = target.namespace,
            name = target.name,
            position = index,
            "Deleting role binding"
        );

        match client
            .delete_role_binding(target.namespace, target.name)
            .await
        {
            Ok(()) => {}
            Err(ClusterError::NotFound(_)) if policy == AbsentBindingPolicy::Ignore => {
                tracing::debug!(
                    namespace = target.namespace,
                    name = target.name,
                    "Role binding already absent"
                );
            }
            Err(source) => {
                tracing::warn!(
                    environment_id = client.environment_id(),
                    namespace = target.namespace,
                    name = target.name,
                    attempted = index,
                    skipped = targets.len() - index - 1,
                    error = %source,
                    "Aborting role binding batch"
                );

                return Err(K8sError::DeleteFailed {
                    namespace: target.namespace.to_string(),
                    name: target.name.to_string(),
                    source,
                });
            }
        }
    }

    tracing::info!(
        environment_id = client.environment_id(),
        bindings = targets.len(),
        "Role bindings deleted"
    );

    Ok(())
}

/// Whether a binding belongs to the cluster's own machinery
pub fn is_system_binding(namespace: &str, name: &str, system_namespaces: &[String]) -> bool {
    name.starts_with("system:") || system_namespaces.iter().any(|ns| ns == namespace)
}

fn role_binding_to_info(
    binding: k8s_openapi::api::rbac::v1::RoleBinding,
    system_namespaces: &[String],
) -> RoleBinding {
    let metadata = binding.metadata;

    let role_ref = RoleRef {
        api_group: binding.role_ref.api_group,
        kind: binding.role_ref.kind,
        name: binding.role_ref.name,
    };

    let subjects: Vec<Subject> = binding
        .subjects
        .unwrap_or_default()
        .into_iter()
        .map(|s| Subject {
            kind: s.kind,
            name: s.name,
            namespace: s.namespace,
            api_group: s.api_group,
        })
        .collect();

    let name = metadata.name.unwrap_or_default();
    let namespace = metadata.namespace.unwrap_or_default();
    let is_system = is_system_binding(&namespace, &name, system_namespaces);

    RoleBinding {
        name,
        namespace,
        uid: metadata.uid,
        resource_version: metadata.resource_version,
        role_ref,
        subjects,
        labels: metadata.labels.unwrap_or_default(),
        created_at: metadata.creation_timestamp.map(|t| t.0.to_rfc3339()),
        is_system,
    }
}

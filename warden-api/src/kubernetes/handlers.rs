//! HTTP handlers for role binding endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use warden_common::auth::CallerContext;
use warden_common::rbac::{DeleteRequestBatch, RoleBinding};

use super::error::K8sError;
use super::provider::EnvironmentId;
use super::rbac;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

/// Role binding routes; expects the auth middleware to be layered on top
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/kubernetes/:id/rolebindings", get(list_role_bindings))
        .route(
            "/api/kubernetes/:id/role_bindings/delete",
            post(delete_role_bindings),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRoleBindingsQuery {
    #[serde(default)]
    pub namespace: String,
}

pub async fn list_role_bindings(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Path(environment_id): Path<EnvironmentId>,
    Query(query): Query<ListRoleBindingsQuery>,
) -> Result<Json<Vec<RoleBinding>>, ApiError> {
    if !query.namespace.is_empty() {
        validation::validate_namespace(&query.namespace)
            .map_err(|e| K8sError::InvalidPayload(e.to_string()))?;
    }

    let client = state
        .provider
        .obtain(&caller, environment_id)
        .await
        .inspect_err(|e| {
            tracing::error!(
                context = "ListRoleBindings",
                environment_id,
                user = %caller.username,
                error = %e,
                "Unable to prepare kube client"
            )
        })?;

    let bindings = rbac::list_role_bindings(
        client.as_ref(),
        &query.namespace,
        &state.kubernetes.system_namespaces,
    )
    .await
    .inspect_err(|e| {
        tracing::error!(
            context = "ListRoleBindings",
            environment_id,
            namespace = %query.namespace,
            error = %e,
            "Unable to fetch role bindings"
        )
    })?;

    Ok(Json(bindings))
}

pub async fn delete_role_bindings(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerContext>,
    Path(environment_id): Path<EnvironmentId>,
    payload: Result<Json<DeleteRequestBatch>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(batch) = payload.map_err(|e| K8sError::InvalidPayload(e.body_text()))?;
    validation::validate_delete_batch(&batch)
        .map_err(|e| K8sError::InvalidPayload(e.to_string()))?;

    let client = state
        .provider
        .obtain(&caller, environment_id)
        .await
        .inspect_err(|e| {
            tracing::error!(
                context = "DeleteRoleBindings",
                environment_id,
                user = %caller.username,
                error = %e,
                "Unable to prepare kube client"
            )
        })?;

    rbac::delete_role_bindings(client.as_ref(), &batch, state.kubernetes.absent_bindings).await?;

    Ok(StatusCode::NO_CONTENT)
}

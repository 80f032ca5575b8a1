//! Common test utilities and helpers

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use warden_api::config::WardenConfig;
use warden_api::kubernetes::memory::{InMemoryCluster, InMemoryProvider};
use warden_api::kubernetes::AbsentBindingPolicy;
use warden_api::middleware::auth::generate_jwt_token;
use warden_api::{build_router, AppState};
use warden_common::auth::CallerContext;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Cluster with two teams, one binding each plus one system binding
pub fn seeded_cluster(environment_id: u32) -> Arc<InMemoryCluster> {
    Arc::new(
        InMemoryCluster::new(environment_id)
            .with_binding("team-a", "b1", "view")
            .with_binding("team-b", "b1", "edit")
            .with_binding("kube-system", "system:controller", "admin"),
    )
}

/// Test environment setup
pub struct TestEnv {
    pub app: Router,
    pub token: String,
}

impl TestEnv {
    pub fn new(provider: InMemoryProvider) -> Self {
        Self::with_policy(provider, AbsentBindingPolicy::Ignore)
    }

    pub fn with_policy(provider: InMemoryProvider, policy: AbsentBindingPolicy) -> Self {
        let mut config = WardenConfig::default();
        config.auth.jwt_secret = TEST_SECRET.to_string();
        config.kubernetes.absent_bindings = policy;

        let state = Arc::new(AppState::new(&config, Arc::new(provider)));
        let token = token_for(&CallerContext::new("u-1", "alice"));

        TestEnv {
            app: build_router(state),
            token,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&self.token), Body::empty())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&self.token), Body::from(body.to_string()))
            .await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Body,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

pub fn token_for(caller: &CallerContext) -> String {
    generate_jwt_token(TEST_SECRET, caller, 3600).unwrap()
}

//! Role Binding Endpoint Tests
//! Listing and namespace-grouped bulk deletion through the HTTP surface

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use common::{seeded_cluster, TestEnv};
use warden_api::kubernetes::memory::{InMemoryCluster, InMemoryProvider};
use warden_api::kubernetes::{AbsentBindingPolicy, ClusterError};
use std::sync::Arc;

const LIST_URI: &str = "/api/kubernetes/1/rolebindings";
const DELETE_URI: &str = "/api/kubernetes/1/role_bindings/delete";

// ============== Authentication Tests ==============

#[tokio::test]
async fn test_health_needs_no_token() {
    let env = TestEnv::new(InMemoryProvider::new());
    let (status, _) = env
        .send(Method::GET, "/api/health", None, Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let cluster = seeded_cluster(1);
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster.clone()));

    let (status, body) = env.send(Method::GET, LIST_URI, None, Body::empty()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = env
        .send(
            Method::POST,
            DELETE_URI,
            Some("not-a-jwt"),
            Body::from(r#"{"team-a":["b1"]}"#),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cluster.contains("team-a", "b1").await);
    assert!(cluster.delete_attempts().await.is_empty());
}

// ============== Listing Tests ==============

#[tokio::test]
async fn test_list_all_namespaces() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["namespace"], "team-a");
    assert_eq!(items[0]["name"], "b1");
    assert_eq!(items[0]["role_ref"]["name"], "view");
    assert_eq!(items[0]["is_system"], false);
    assert_eq!(items[2]["namespace"], "kube-system");
    assert_eq!(items[2]["is_system"], true);
}

#[tokio::test]
async fn test_list_with_namespace_filter() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, body) = env.get("/api/kubernetes/1/rolebindings?namespace=team-b").await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["namespace"], "team-b");
    assert_eq!(items[0]["role_ref"]["name"], "edit");
}

#[tokio::test]
async fn test_list_empty_namespace_is_empty_array() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, body) = env.get("/api/kubernetes/1/rolebindings?namespace=team-z").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_list_unknown_environment() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, body) = env.get("/api/kubernetes/42/rolebindings").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_unreachable_environment_hides_cause() {
    let env = TestEnv::new(InMemoryProvider::new().with_unreachable(1));

    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "Unable to prepare kube client");
    assert!(!body.to_string().contains("unreachable"));
}

#[tokio::test]
async fn test_list_failure_is_not_partial() {
    let cluster = seeded_cluster(1);
    cluster
        .fail_list(ClusterError::Transport("connection reset".to_string()))
        .await;
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster));

    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.is_array());
}

#[tokio::test]
async fn test_list_forbidden_namespace() {
    let provider = InMemoryProvider::new()
        .with_environment(seeded_cluster(1))
        .with_grant("alice", ["team-a"]);
    let env = TestEnv::new(provider);

    let (status, _) = env.get("/api/kubernetes/1/rolebindings?namespace=team-b").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unfiltered listing only shows what the caller may see
    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["namespace"], "team-a");
}

#[tokio::test]
async fn test_caller_denied_environment() {
    let cluster = seeded_cluster(1);
    let provider = InMemoryProvider::new()
        .with_environment(cluster.clone())
        .with_grant("alice", Vec::<String>::new());
    let env = TestEnv::new(provider);

    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("alice"));

    let (status, _) = env.post_json(DELETE_URI, r#"{"team-a":["b1"]}"#).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(cluster.delete_attempts().await.is_empty());
}

#[tokio::test]
async fn test_list_rejects_malformed_namespace_filter() {
    let cluster = seeded_cluster(1);
    cluster
        .fail_list(ClusterError::Transport("must not be reached".to_string()))
        .await;
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster));

    for filter in [
        "..%2F..%2Fnamespaces%2Fkube-system",
        "team-a%2Fsecrets",
        "Team-A",
        "team-a%3Fwatch%3Dtrue",
    ] {
        let (status, body) = env
            .get(&format!("/api/kubernetes/1/rolebindings?namespace={}", filter))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "filter {}", filter);
        assert_eq!(body["error"], "BAD_REQUEST", "filter {}", filter);
    }
}

#[tokio::test]
async fn test_list_malformed_filter_wins_over_unknown_environment() {
    let env = TestEnv::new(InMemoryProvider::new());

    let (status, _) = env
        .get("/api/kubernetes/7/rolebindings?namespace=..%2Fkube-system")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_environment_id() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, _) = env.get("/api/kubernetes/prod/rolebindings").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============== Deletion Tests ==============

#[tokio::test]
async fn test_delete_across_namespaces() {
    let cluster = seeded_cluster(1);
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster.clone()));

    let (status, body) = env
        .post_json(DELETE_URI, r#"{"team-a":["b1"],"team-b":["b1"]}"#)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);

    assert_eq!(cluster.delete_attempts().await, vec!["team-a/b1", "team-b/b1"]);

    let (status, body) = env.get(LIST_URI).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["namespace"], "kube-system");
}

#[tokio::test]
async fn test_delete_resubmission_succeeds_when_ignoring_absent() {
    let cluster = seeded_cluster(1);
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster.clone()));
    let payload = r#"{"team-a":["b1"]}"#;

    let (status, _) = env.post_json(DELETE_URI, payload).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = env.post_json(DELETE_URI, payload).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(cluster.delete_attempts().await, vec!["team-a/b1", "team-a/b1"]);
}

#[tokio::test]
async fn test_delete_stops_at_first_failure() {
    let cluster = seeded_cluster(1);
    let env = TestEnv::with_policy(
        InMemoryProvider::new().with_environment(cluster.clone()),
        AbsentBindingPolicy::Fail,
    );

    // team-a/b2 does not exist, so team-b/b1 is never attempted
    let (status, body) = env
        .post_json(DELETE_URI, r#"{"team-a":["b1","b2"],"team-b":["b1"]}"#)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("team-a/b2"));

    assert_eq!(cluster.delete_attempts().await, vec!["team-a/b1", "team-a/b2"]);
    assert!(!cluster.contains("team-a", "b1").await);
    assert!(cluster.contains("team-b", "b1").await);
}

#[tokio::test]
async fn test_delete_injected_failure_keeps_earlier_deletions() {
    let cluster = Arc::new(
        InMemoryCluster::new(1)
            .with_binding("ns1", "a", "view")
            .with_binding("ns1", "b", "view")
            .with_binding("ns2", "c", "view")
            .with_binding("ns2", "d", "view"),
    );
    cluster
        .fail_delete(
            "ns2",
            "c",
            ClusterError::Api {
                code: 500,
                reason: "InternalError".to_string(),
                message: "etcdserver: request timed out".to_string(),
            },
        )
        .await;
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster.clone()));

    let (status, _) = env
        .post_json(DELETE_URI, r#"{"ns1":["a","b"],"ns2":["c","d"]}"#)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(cluster.names("ns1").await, Vec::<String>::new());
    assert_eq!(cluster.names("ns2").await, vec!["c", "d"]);
    assert_eq!(cluster.delete_attempts().await, vec!["ns1/a", "ns1/b", "ns2/c"]);
}

#[tokio::test]
async fn test_delete_forbidden_namespace() {
    let cluster = seeded_cluster(1);
    let provider = InMemoryProvider::new()
        .with_environment(cluster.clone())
        .with_grant("alice", ["team-a"]);
    let env = TestEnv::new(provider);

    let (status, body) = env
        .post_json(DELETE_URI, r#"{"team-a":["b1"],"team-b":["b1"]}"#)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    assert!(!cluster.contains("team-a", "b1").await);
    assert!(cluster.contains("team-b", "b1").await);
}

#[tokio::test]
async fn test_delete_unknown_environment() {
    let env = TestEnv::new(InMemoryProvider::new().with_environment(seeded_cluster(1)));

    let (status, _) = env
        .post_json("/api/kubernetes/7/role_bindings/delete", r#"{"team-a":["b1"]}"#)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unreachable_environment() {
    let env = TestEnv::new(InMemoryProvider::new().with_unreachable(1));

    let (status, body) = env.post_json(DELETE_URI, r#"{"team-a":["b1"]}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "Unable to prepare kube client");
}

#[tokio::test]
async fn test_delete_rejects_invalid_payloads_before_any_call() {
    let cluster = seeded_cluster(1);
    let env = TestEnv::new(InMemoryProvider::new().with_environment(cluster.clone()));

    for payload in [
        "{}",
        r#"["team-a","b1"]"#,
        r#"{"team-a":"b1"}"#,
        r#"{"team-a":[]}"#,
        r#"{"Team_A":["b1"]}"#,
        r#"{"":["b1"]}"#,
        r#"{"team-a":[""]}"#,
        r#"{"team-a":["b1?dryRun=All"]}"#,
        r#"{"team-a":["b1#x"]}"#,
        r#"{"team-a":["b1"],"team-a":["b2"]}"#,
        "not json",
    ] {
        let (status, body) = env.post_json(DELETE_URI, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["error"], "BAD_REQUEST", "payload {}", payload);
    }

    assert!(cluster.delete_attempts().await.is_empty());
    assert!(cluster.contains("team-a", "b1").await);
}

#[tokio::test]
async fn test_delete_invalid_payload_wins_over_unknown_environment() {
    let env = TestEnv::new(InMemoryProvider::new());

    let (status, body) = env
        .post_json("/api/kubernetes/7/role_bindings/delete", "{}")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("missing deletion request list"));
}

///! Caller identity types

use serde::{Deserialize, Serialize};

/// Authenticated identity attached to an inbound request.
///
/// Cluster clients are scoped to this identity through impersonation, so
/// `username` and `groups` must match what the cluster's authenticator
/// would report for the same person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }
}

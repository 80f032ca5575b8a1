//! Warden API Library
//!
//! Caller-scoped access to Kubernetes role bindings, exposed for the server
//! binary and for tests.

pub mod app;
pub mod config;
pub mod error;
pub mod kubernetes;
pub mod logging;
pub mod middleware;
pub mod state;
pub mod validation;

pub use app::build_router;
pub use state::AppState;

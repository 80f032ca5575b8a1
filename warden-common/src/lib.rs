//! Common types shared between warden-api and its clients

pub mod auth;
pub mod rbac;

/// Common error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

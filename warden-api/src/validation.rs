///! Input validation for role binding payloads
///!
///! Everything here runs before any cluster interaction.

use regex::Regex;
use std::sync::LazyLock;
use warden_common::rbac::DeleteRequestBatch;
use warden_common::Error;

/// Kubernetes limits
pub const MAX_NAMESPACE_LENGTH: usize = 63;
pub const MAX_OBJECT_NAME_LENGTH: usize = 253;

/// DNS-1123 label
static NAMESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap()
});

/// Validation result type
pub type ValidationResult<T> = warden_common::Result<T>;

/// Namespace validation
pub fn validate_namespace(namespace: &str) -> ValidationResult<()> {
    if namespace.is_empty() {
        return Err(Error::Validation(
            "deletion given with empty namespace".to_string(),
        ));
    }

    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Err(Error::Validation(format!(
            "namespace '{}' too long (max {} characters)",
            namespace, MAX_NAMESPACE_LENGTH
        )));
    }

    if !NAMESPACE_REGEX.is_match(namespace) {
        return Err(Error::Validation(format!(
            "namespace '{}' must consist of lower case alphanumeric characters or '-'",
            namespace
        )));
    }

    Ok(())
}

/// Role binding name validation.
///
/// RBAC objects accept any name that is a valid path segment, so
/// `system:controller:foo` is fine while `a/b` is not.
pub fn validate_binding_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(Error::Validation("role binding name cannot be empty".to_string()));
    }

    if name.len() > MAX_OBJECT_NAME_LENGTH {
        return Err(Error::Validation(format!(
            "role binding name too long (max {} characters)",
            MAX_OBJECT_NAME_LENGTH
        )));
    }

    if name == "." || name == ".." {
        return Err(Error::Validation(format!(
            "role binding name may not be '{}'",
            name
        )));
    }

    if let Some(c) = name.chars().find(|&c| matches!(c, '/' | '%' | '?' | '#')) {
        return Err(Error::Validation(format!(
            "role binding name '{}' may not contain '{}'",
            name, c
        )));
    }

    Ok(())
}

/// Structural validation of a bulk delete payload
pub fn validate_delete_batch(batch: &DeleteRequestBatch) -> ValidationResult<()> {
    if batch.is_empty() {
        return Err(Error::Validation(
            "missing deletion request list in payload".to_string(),
        ));
    }

    for (namespace, names) in batch.groups() {
        validate_namespace(namespace)?;

        if names.is_empty() {
            return Err(Error::Validation(format!(
                "no role bindings given for namespace '{}'",
                namespace
            )));
        }

        for name in names {
            validate_binding_name(name)?;
        }
    }

    Ok(())
}

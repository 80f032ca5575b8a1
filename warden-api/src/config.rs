//! Configuration management for Warden API
//!
//! This module provides a centralized configuration system that loads settings from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use warden_common::auth::CallerContext;

use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::provider::EnvironmentId;
use crate::kubernetes::rbac::AbsentBindingPolicy;

/// Main configuration struct for Warden
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Role binding behavior
    pub kubernetes: KubernetesConfig,
    /// Registered environments
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<EnvironmentConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Enable file logging
    pub file_logging_enabled: bool,
    /// Emit console logs as JSON
    pub json_format: bool,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for HS256 bearer tokens
    pub jwt_secret: String,
    /// Lifetime of issued tokens, in seconds
    pub token_ttl_secs: u64,
}

/// Role binding behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// What a delete of an already-absent binding means
    pub absent_bindings: AbsentBindingPolicy,
    /// Namespaces whose bindings are flagged as system bindings
    pub system_namespaces: Vec<String>,
}

/// A target cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: EnvironmentId,
    pub name: String,
    /// Kubeconfig of the service identity used to impersonate callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_path: Option<PathBuf>,
    /// Kubeconfig context; current-context when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Use the pod's service account instead of a kubeconfig
    #[serde(default)]
    pub in_cluster: bool,
    /// Caller groups allowed to use this environment; everyone when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_groups: Vec<String>,
}

/// Where an environment's base credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KubeconfigSource<'a> {
    File(&'a Path),
    InCluster,
}

impl EnvironmentConfig {
    /// Resolve the credential source; an explicit kubeconfig wins over in-cluster
    pub fn source(&self) -> K8sResult<KubeconfigSource<'_>> {
        match (&self.kubeconfig_path, self.in_cluster) {
            (Some(path), _) => Ok(KubeconfigSource::File(path)),
            (None, true) => Ok(KubeconfigSource::InCluster),
            (None, false) => Err(K8sError::ClientUnavailable(format!(
                "Environment {} has neither a kubeconfig nor in-cluster credentials",
                self.id
            ))),
        }
    }

    /// Whether `caller` may obtain a client for this environment
    pub fn admits(&self, caller: &CallerContext) -> bool {
        self.allowed_groups.is_empty()
            || caller
                .groups
                .iter()
                .any(|group| self.allowed_groups.contains(group))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9443,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("/var/log/warden"),
            file_logging_enabled: false,
            json_format: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 86400,
        }
    }
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            absent_bindings: AbsentBindingPolicy::Ignore,
            system_namespaces: vec![
                "kube-system".to_string(),
                "kube-public".to_string(),
                "kube-node-lease".to_string(),
            ],
        }
    }
}

impl WardenConfig {
    /// Load configuration from the config file (if any) and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Environment variable override
            std::env::var("WARDEN_CONFIG").ok().map(PathBuf::from),
            // Standard locations
            Some(PathBuf::from("./warden.toml")),
            Some(PathBuf::from("/etc/warden/warden.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `WARDEN_*` overrides read through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Server
        if let Some(host) = lookup("WARDEN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("WARDEN_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        // Logging
        if let Some(level) = lookup("WARDEN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = lookup("WARDEN_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(path);
        }
        if let Some(enabled) = lookup("WARDEN_FILE_LOGGING") {
            self.logging.file_logging_enabled = enabled.parse().unwrap_or(true);
        }
        if let Some(json) = lookup("WARDEN_LOG_JSON") {
            self.logging.json_format = json.parse().unwrap_or(false);
        }

        // Auth
        if let Some(secret) = lookup("WARDEN_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        // Kubernetes
        match lookup("WARDEN_ABSENT_BINDINGS").as_deref() {
            Some("ignore") => self.kubernetes.absent_bindings = AbsentBindingPolicy::Ignore,
            Some("fail") => self.kubernetes.absent_bindings = AbsentBindingPolicy::Fail,
            Some(other) => {
                tracing::warn!("Ignoring unknown WARDEN_ABSENT_BINDINGS value '{}'", other)
            }
            None => {}
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("Port cannot be 0".to_string()));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Validation(
                "auth.jwt_secret (or WARDEN_JWT_SECRET) must be set".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for env in &self.environments {
            if !seen.insert(env.id) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate environment id {}",
                    env.id
                )));
            }

            if env.kubeconfig_path.is_none() && !env.in_cluster {
                return Err(ConfigError::Validation(format!(
                    "Environment {} ('{}') needs kubeconfig_path or in_cluster = true",
                    env.id, env.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Config validation failed: {0}")]
    Validation(String),
}

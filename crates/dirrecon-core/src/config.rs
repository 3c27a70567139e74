//! Configuration types
//!
//! Base trait and the configuration structures shared by directory
//! implementations and the lifecycle manager.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Placeholder written over secrets in redacted configs.
pub const REDACTED: &str = "***REDACTED***";

/// Trait for directory configuration.
pub trait DirectoryConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    fn validate(&self) -> DirectoryResult<()>;

    /// Create a redacted version of this config (for logging/display).
    ///
    /// Sensitive fields should be replaced with placeholders.
    fn redacted(&self) -> Self;

    /// Deserialize from JSON and validate.
    fn from_json(json: &str) -> DirectoryResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            DirectoryError::invalid_configuration(format!("failed to parse configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Connection settings shared across directory implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds (0 disables it).
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_operation_timeout() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

impl ConnectionSettings {
    /// Create new connection settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the per-operation timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, secs: u64) -> Self {
        self.operation_timeout_secs = secs;
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the per-operation timeout, if enabled.
    pub fn operation_timeout(&self) -> Option<std::time::Duration> {
        (self.operation_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.operation_timeout_secs))
    }
}

/// SSL/TLS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_certificate: true,
        }
    }
}

impl TlsConfig {
    /// Log a warning if the TLS configuration is insecure.
    ///
    /// Call after deserializing configuration from external sources.
    pub fn validate_security(&self) {
        if !self.verify_certificate {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is DISABLED. \
                 The connection is open to man-in-the-middle attacks."
            );
        }
    }

    /// TLS config that skips certificate verification (tests and local labs).
    #[cfg(any(test, debug_assertions))]
    pub fn insecure() -> Self {
        Self {
            verify_certificate: false,
        }
    }
}

/// Settings for the user post-create steps.
#[derive(Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Credential set on newly created users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_password: Option<String>,

    /// Account-control value that marks an account as enabled.
    #[serde(default = "default_enabled_account_control")]
    pub enabled_account_control: u32,
}

fn default_enabled_account_control() -> u32 {
    // NORMAL_ACCOUNT
    0x200
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            initial_password: None,
            enabled_account_control: default_enabled_account_control(),
        }
    }
}

impl std::fmt::Debug for LifecycleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleConfig")
            .field(
                "initial_password",
                &self.initial_password.as_ref().map(|_| REDACTED),
            )
            .field("enabled_account_control", &self.enabled_account_control)
            .finish()
    }
}

impl LifecycleConfig {
    /// Create a lifecycle config with the given initial password.
    pub fn with_initial_password(password: impl Into<String>) -> Self {
        Self {
            initial_password: Some(password.into()),
            ..Self::default()
        }
    }
}

impl DirectoryConfig for LifecycleConfig {
    fn validate(&self) -> DirectoryResult<()> {
        if self.initial_password.as_deref() == Some("") {
            return Err(DirectoryError::invalid_configuration(
                "initial_password cannot be empty",
            ));
        }
        Ok(())
    }

    fn redacted(&self) -> Self {
        Self {
            initial_password: self.initial_password.as_ref().map(|_| REDACTED.to_string()),
            enabled_account_control: self.enabled_account_control,
        }
    }
}

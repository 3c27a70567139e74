//! Directory error types
//!
//! Error definitions for path handling and directory operations, with
//! transient/permanent classification.

use thiserror::Error;

use crate::result::{OperationResult, ResultCode};

/// Error that can occur while modelling or operating on directory objects.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Path errors (permanent)
    /// The path text does not split into `attributeType=value` components.
    #[error("malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    /// A move was requested for a path with no parent container.
    #[error("path '{path}' has no parent container")]
    RootPath { path: String },

    /// The naming attribute of a path does not fit the object kind.
    #[error("path '{path}' must be named by '{expected}' for {kind} objects")]
    NamingMismatch {
        path: String,
        kind: String,
        expected: String,
    },

    // Directory-reported errors, each keeping the result that produced it
    /// The directory reports that the object does not exist.
    #[error("object not found: {path}")]
    ObjectNotFound {
        path: String,
        result: Box<OperationResult>,
    },

    /// The directory reports that the object already exists.
    #[error("object already exists: {path}")]
    ObjectAlreadyExists {
        path: String,
        result: Box<OperationResult>,
    },

    /// Bind failed because of invalid credentials.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed { result: Box<OperationResult> },

    /// The bound principal may not perform the operation.
    #[error("insufficient access rights for {operation} on {path}")]
    InsufficientAccess {
        operation: String,
        path: String,
        result: Box<OperationResult>,
    },

    /// Protocol-level failure carrying the full directory result.
    #[error(
        "{} failed on '{}' with code {} ({}): {}",
        .result.operation,
        .result.target_path,
        .result.result_code,
        .result.description,
        .result.message
    )]
    Operation { result: Box<OperationResult> },

    // Transport errors (usually transient)
    /// Failed to reach or talk to the directory server.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory server is busy or unavailable.
    #[error("directory unavailable: {message}")]
    Unavailable {
        message: String,
        result: Box<OperationResult>,
    },

    // Lifecycle errors
    /// The object was created but a post-create step failed.
    #[error("object '{path}' created but {stage} failed: {source}")]
    PartialLifecycle {
        path: String,
        stage: LifecycleStage,
        #[source]
        source: Box<DirectoryError>,
    },

    // Configuration errors (permanent)
    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Post-create step of a user lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Setting the initial credential.
    SetCredential,
    /// Replacing the account-control attribute with the enabled value.
    EnableAccount,
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleStage::SetCredential => write!(f, "setting the initial credential"),
            LifecycleStage::EnableAccount => write!(f, "enabling the account"),
        }
    }
}

impl DirectoryError {
    /// Check if this error is transient and the caller may retry.
    ///
    /// Nothing in this workspace retries; the classification is for callers
    /// running their own retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. } | DirectoryError::Unavailable { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this error only says that an attribute value could not be
    /// matched (absent attribute, unknown type, no equality rule, bad syntax).
    ///
    /// The differ treats these as "not equal" instead of failing.
    pub fn is_comparison_mismatch(&self) -> bool {
        match self {
            DirectoryError::Operation { result } => ResultCode::from(result.result_code)
                .is_attribute_mismatch(),
            _ => false,
        }
    }

    /// The directory result attached to this error, if any.
    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            DirectoryError::Operation { result }
            | DirectoryError::ObjectNotFound { result, .. }
            | DirectoryError::ObjectAlreadyExists { result, .. }
            | DirectoryError::AuthenticationFailed { result }
            | DirectoryError::InsufficientAccess { result, .. }
            | DirectoryError::Unavailable { result, .. } => Some(result),
            DirectoryError::PartialLifecycle { source, .. } => source.result(),
            _ => None,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::MalformedPath { .. } => "MALFORMED_PATH",
            DirectoryError::RootPath { .. } => "ROOT_PATH",
            DirectoryError::NamingMismatch { .. } => "NAMING_MISMATCH",
            DirectoryError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            DirectoryError::ObjectAlreadyExists { .. } => "OBJECT_EXISTS",
            DirectoryError::AuthenticationFailed { .. } => "AUTH_FAILED",
            DirectoryError::InsufficientAccess { .. } => "INSUFFICIENT_ACCESS",
            DirectoryError::Operation { .. } => "OPERATION_FAILED",
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::Unavailable { .. } => "UNAVAILABLE",
            DirectoryError::PartialLifecycle { .. } => "PARTIAL_LIFECYCLE",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    /// Convert a non-success directory result into the matching error.
    ///
    /// Well-known result codes get their own variant; everything else keeps
    /// the whole result in [`DirectoryError::Operation`].
    pub fn from_result(result: OperationResult) -> Self {
        match ResultCode::from(result.result_code) {
            ResultCode::NoSuchObject => DirectoryError::ObjectNotFound {
                path: result.target_path.clone(),
                result: Box::new(result),
            },
            ResultCode::EntryAlreadyExists => DirectoryError::ObjectAlreadyExists {
                path: result.target_path.clone(),
                result: Box::new(result),
            },
            ResultCode::InvalidCredentials => DirectoryError::AuthenticationFailed {
                result: Box::new(result),
            },
            ResultCode::InsufficientAccessRights => DirectoryError::InsufficientAccess {
                operation: result.operation.to_string(),
                path: result.target_path.clone(),
                result: Box::new(result),
            },
            ResultCode::Busy | ResultCode::Unavailable => DirectoryError::Unavailable {
                message: format!("{} ({})", result.description, result.message),
                result: Box::new(result),
            },
            _ => DirectoryError::Operation {
                result: Box::new(result),
            },
        }
    }

    // Convenience constructors

    /// Create a malformed path error.
    pub fn malformed_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DirectoryError::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

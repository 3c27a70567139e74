//! # Directory Reconciliation Core
//!
//! Protocol-independent core for managing directory objects (user accounts
//! and organizational units): creating, deleting, and reconciling an
//! existing object's attributes, name and location with a desired state.
//!
//! ## Architecture
//!
//! - [`DirectoryConnection`](traits::DirectoryConnection) - primitive
//!   directory operations, implemented per protocol
//! - [`DistinguishedPath`](path::DistinguishedPath) - path parsing and
//!   composition
//! - [`diff`](differ::diff) - compares a desired state with the directory
//! - [`ReconciliationEngine`](engine::ReconciliationEngine) - orders and
//!   applies rename, move and attribute replacement
//! - [`ObjectLifecycleManager`](lifecycle::ObjectLifecycleManager) - create
//!   and delete, including user post-create steps
//!
//! ## Example
//!
//! ```ignore
//! use dirrecon_core::prelude::*;
//!
//! let path = DistinguishedPath::parse("CN=test4,OU=IT,DC=example,DC=com")?;
//! let desired = DesiredState::new()
//!     .with("Sn", "Lee")
//!     .relocated_to(DistinguishedPath::parse("CN=test4,OU=HR,DC=example,DC=com")?);
//!
//! let engine = ReconciliationEngine::new(&connection);
//! let outcome = engine.update(&path, desired).await?;
//! assert!(outcome.result.is_success());
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error taxonomy with transient/permanent classification
//! - [`types`] - Object kinds and operation types
//! - [`path`] - Distinguished paths
//! - [`operation`] - Attribute values, attribute sets, change sets
//! - [`desired`] - Desired object state
//! - [`result`] - Directory result shape and result codes
//! - [`traits`] - The directory connection capability
//! - [`config`] - Configuration types and traits
//! - [`differ`], [`engine`], [`lifecycle`] - The reconciliation core

pub mod config;
pub mod desired;
pub mod differ;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod operation;
pub mod path;
pub mod result;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use dirrecon_core::prelude::*;
/// ```
pub mod prelude {
    // Types and enums
    pub use crate::types::{ObjectKind, OperationType};

    // Error handling
    pub use crate::error::{DirectoryError, DirectoryResult, LifecycleStage};

    // Paths
    pub use crate::path::{DistinguishedPath, Rdn};

    // Operations
    pub use crate::desired::DesiredState;
    pub use crate::operation::{AttributeChange, AttributeSet, AttributeValue, ChangeSet};
    pub use crate::result::{OperationResult, ResultCode};

    // Traits
    pub use crate::traits::DirectoryConnection;

    // Configuration
    pub use crate::config::{ConnectionSettings, DirectoryConfig, LifecycleConfig, TlsConfig};

    // Core
    pub use crate::differ::{diff, Diff};
    pub use crate::engine::{ReconcileOutcome, ReconcilePhase, ReconciliationEngine, WorkingPath};
    pub use crate::lifecycle::ObjectLifecycleManager;
}

// Re-export async_trait for connection implementors
pub use async_trait::async_trait;

//! Directory connection capability
//!
//! The primitive operations the reconciliation engine and the lifecycle
//! manager are built on. Implementations own transport, binding and
//! security; the core never sees how a connection was constructed.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::operation::{AttributeSet, AttributeValue, ChangeSet};
use crate::path::{DistinguishedPath, Rdn};
use crate::result::OperationResult;

/// Primitive operations against a directory server.
///
/// Every call is a single blocking round-trip from the caller's point of
/// view. Non-success directory results are returned as errors built with
/// [`crate::error::DirectoryError::from_result`], so a returned
/// [`OperationResult`] always reports success.
///
/// One value is meant to be used by one caller at a time; the directory
/// server is the only shared state.
#[async_trait]
pub trait DirectoryConnection: Send + Sync {
    /// Assert that `attribute` on `path` holds `value`.
    ///
    /// Returns `Ok(false)` when the value differs and also when the attribute
    /// is absent or cannot be matched. Errors are reserved for transport,
    /// authentication and missing-object failures.
    async fn compare(
        &self,
        path: &DistinguishedPath,
        attribute: &str,
        value: &AttributeValue,
    ) -> DirectoryResult<bool>;

    /// Replace every attribute in `changes` on `path` in one request.
    async fn modify(
        &self,
        path: &DistinguishedPath,
        changes: &ChangeSet,
    ) -> DirectoryResult<OperationResult>;

    /// Change the naming component of `path` in place, keeping its parent.
    async fn rename(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
    ) -> DirectoryResult<OperationResult>;

    /// Move `path` under `new_parent` with naming component `new_rdn`.
    async fn move_to(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
        new_parent: &DistinguishedPath,
    ) -> DirectoryResult<OperationResult>;

    /// Create an entry with the given object classes and attributes.
    async fn create(
        &self,
        path: &DistinguishedPath,
        object_classes: &[&str],
        attributes: &AttributeSet,
    ) -> DirectoryResult<OperationResult>;

    /// Delete an entry.
    async fn delete(&self, path: &DistinguishedPath) -> DirectoryResult<OperationResult>;

    /// Set the credential of an account.
    async fn set_password(
        &self,
        path: &DistinguishedPath,
        password: &str,
    ) -> DirectoryResult<OperationResult>;

    /// Check whether `principal` can bind with `secret`.
    ///
    /// Returns `false` for any failure; bad credentials are routine input,
    /// not an error.
    async fn check_credentials(&self, principal: &str, secret: &str) -> bool;
}

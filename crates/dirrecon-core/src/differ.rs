//! Attribute differ
//!
//! Compares a desired state against what the directory currently holds for
//! an object. Every comparison is a fresh `compare` against the server; no
//! object state is cached.

use tracing::{debug, instrument};

use crate::desired::{is_reserved, DesiredState};
use crate::error::{DirectoryError, DirectoryResult};
use crate::operation::{AttributeValue, ChangeSet};
use crate::path::DistinguishedPath;
use crate::traits::DirectoryConnection;

/// What has to change for an object to match its desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// New naming value, if the current one differs.
    pub rename: Option<String>,
    /// Target path, whenever a move was requested.
    pub relocate: Option<DistinguishedPath>,
    /// Ordinary attributes whose current value differs.
    pub changes: ChangeSet,
}

impl Diff {
    /// Whether nothing needs to be done.
    pub fn is_empty(&self) -> bool {
        self.rename.is_none() && self.relocate.is_none() && self.changes.is_empty()
    }
}

/// Diff `desired` against the object at `path`.
///
/// - The naming value is compared through the path's naming attribute.
/// - A requested relocation is always kept, without comparing paths.
/// - Other attributes are compared in insertion order; unequal or absent
///   attributes go into the change set.
///
/// A reserved name (`name`, `DistinguishedName`) among the attributes is
/// rejected before anything is compared.
#[instrument(skip_all, fields(path = %path))]
pub async fn diff<C>(
    conn: &C,
    path: &DistinguishedPath,
    desired: &DesiredState,
) -> DirectoryResult<Diff>
where
    C: DirectoryConnection + ?Sized,
{
    if let Some(reserved) = desired.attributes.names().find(|n| is_reserved(n)) {
        return Err(DirectoryError::invalid_configuration(format!(
            "'{reserved}' is reserved for rename and relocate and cannot be replaced"
        )));
    }

    let mut result = Diff::default();

    if let Some(name) = &desired.rename {
        let value = AttributeValue::String(name.clone());
        if !matches(conn, path, path.naming_attribute(), &value).await? {
            debug!(new_name = %name, "Naming value differs");
            result.rename = Some(name.clone());
        }
    }

    // Requested moves are never compared against the current path.
    result.relocate = desired.relocate.clone();

    for (name, value) in desired.attributes.iter() {
        if !matches(conn, path, name, value).await? {
            debug!(attribute = %name, "Attribute differs");
            result.changes.replace(name, value.clone());
        }
    }

    debug!(
        rename = result.rename.is_some(),
        relocate = result.relocate.is_some(),
        changed = result.changes.len(),
        "Diff complete"
    );

    Ok(result)
}

/// Compare one desired value; multi-valued values match only if every value
/// matches.
async fn matches<C>(
    conn: &C,
    path: &DistinguishedPath,
    attribute: &str,
    value: &AttributeValue,
) -> DirectoryResult<bool>
where
    C: DirectoryConnection + ?Sized,
{
    match value {
        AttributeValue::Array(values) => {
            if values.is_empty() {
                return Ok(false);
            }
            for single in values {
                if !compare_one(conn, path, attribute, single).await? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        single => compare_one(conn, path, attribute, single).await,
    }
}

async fn compare_one<C>(
    conn: &C,
    path: &DistinguishedPath,
    attribute: &str,
    value: &AttributeValue,
) -> DirectoryResult<bool>
where
    C: DirectoryConnection + ?Sized,
{
    match conn.compare(path, attribute, value).await {
        Ok(equal) => Ok(equal),
        Err(e) if e.is_comparison_mismatch() => {
            debug!(
                attribute = %attribute,
                error = %e,
                "Comparison not possible, treating as changed"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

//! Reconciliation engine
//!
//! Brings an existing directory object to a desired state with the fewest
//! operations, in an order that never leaves the directory in an invalid
//! intermediate state:
//!
//! ```text
//! Start -> Diffed -> Renamed? -> Moved? -> AttributesApplied -> Done
//! ```
//!
//! 1. Diff once against the original path. Later steps use this diff and
//!    never re-query, since the path is about to change.
//! 2. Rename in place on the original path.
//! 3. Move from the post-rename path to the requested target.
//! 4. Replace every differing attribute in one modify on the final path.
//!
//! A failed rename or move aborts the call before any attribute is written.
//! A rejected modify is returned as-is. Nothing is retried.
//!
//! The engine holds no state between calls. Two concurrent updates of the
//! same object can race; callers that need atomicity must serialize them.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::desired::DesiredState;
use crate::differ::{diff, Diff};
use crate::error::DirectoryResult;
use crate::operation::ChangeSet;
use crate::path::DistinguishedPath;
use crate::result::OperationResult;
use crate::traits::DirectoryConnection;

/// Steps of a single reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Start,
    Diffed,
    Renamed,
    Moved,
    AttributesApplied,
    Done,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcilePhase::Start => "start",
            ReconcilePhase::Diffed => "diffed",
            ReconcilePhase::Renamed => "renamed",
            ReconcilePhase::Moved => "moved",
            ReconcilePhase::AttributesApplied => "attributes_applied",
            ReconcilePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Where the object lives at some point during a reconciliation, together
/// with the result of the last operation that got it there.
///
/// Each step consumes the value and returns the next one; nothing is mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingPath {
    path: DistinguishedPath,
    last_result: Option<OperationResult>,
}

impl WorkingPath {
    /// Start from the object's current path.
    pub fn new(path: DistinguishedPath) -> Self {
        Self {
            path,
            last_result: None,
        }
    }

    /// Current path of the object.
    pub fn path(&self) -> &DistinguishedPath {
        &self.path
    }

    /// Result of the last operation performed, if any.
    pub fn last_result(&self) -> Option<&OperationResult> {
        self.last_result.as_ref()
    }

    /// Rename the naming component in place.
    pub async fn rename<C>(self, conn: &C, new_value: &str) -> DirectoryResult<Self>
    where
        C: DirectoryConnection + ?Sized,
    {
        let renamed = self.path.compose_after_rename(new_value)?;
        let result = conn
            .rename(&self.path, renamed.rdn())
            .await?
            .into_result()?;

        debug!(from = %self.path, to = %renamed, "Renamed object");
        Ok(Self {
            path: renamed,
            last_result: Some(result),
        })
    }

    /// Move to a whole target path.
    ///
    /// The target's naming component is used as the new relative name.
    pub async fn relocate<C>(self, conn: &C, target: &DistinguishedPath) -> DirectoryResult<Self>
    where
        C: DirectoryConnection + ?Sized,
    {
        let (rdn, parent) = target.split_for_move()?;
        let result = conn
            .move_to(&self.path, &rdn, &parent)
            .await?
            .into_result()?;

        debug!(from = %self.path, to = %target, "Moved object");
        Ok(Self {
            path: parent.child(rdn),
            last_result: Some(result),
        })
    }

    /// Replace attributes on the current path in one request.
    pub async fn apply<C>(self, conn: &C, changes: &ChangeSet) -> DirectoryResult<Self>
    where
        C: DirectoryConnection + ?Sized,
    {
        let result = conn.modify(&self.path, changes).await?.into_result()?;

        debug!(path = %self.path, count = changes.len(), "Replaced attributes");
        Ok(Self {
            path: self.path,
            last_result: Some(result),
        })
    }

    /// Final result: the last operation's, or a no-op success.
    pub fn into_parts(self) -> (DistinguishedPath, OperationResult) {
        let result = self
            .last_result
            .unwrap_or_else(|| OperationResult::noop(self.path.to_string()));
        (self.path, result)
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Result of the last operation, or a no-op success.
    pub result: OperationResult,
    /// Path of the object after reconciliation.
    pub path: DistinguishedPath,
    /// Whether a rename was performed.
    pub renamed: bool,
    /// Whether a move was performed.
    pub moved: bool,
    /// Attributes replaced by the final modify, in order.
    pub changed: Vec<String>,
}

impl ReconcileOutcome {
    /// Whether any directory write happened.
    pub fn is_noop(&self) -> bool {
        !self.renamed && !self.moved && self.changed.is_empty()
    }
}

/// Reconciles directory objects over an injected connection.
pub struct ReconciliationEngine<'c, C: ?Sized> {
    conn: &'c C,
}

impl<'c, C> ReconciliationEngine<'c, C>
where
    C: DirectoryConnection + ?Sized,
{
    /// Create an engine over the given connection.
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Compute what [`ReconciliationEngine::update`] would do, without
    /// writing anything.
    pub async fn plan(
        &self,
        path: &DistinguishedPath,
        desired: &DesiredState,
    ) -> DirectoryResult<Diff> {
        diff(self.conn, path, desired).await
    }

    /// Bring the object at `path` to `desired`.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn update(
        &self,
        path: &DistinguishedPath,
        desired: DesiredState,
    ) -> DirectoryResult<ReconcileOutcome> {
        let mut phase = ReconcilePhase::Start;
        debug!(%phase, "Starting reconciliation");

        let Diff {
            rename,
            relocate,
            changes,
        } = diff(self.conn, path, &desired).await?;
        phase = ReconcilePhase::Diffed;
        debug!(%phase, "Computed diff");

        let mut working = WorkingPath::new(path.clone());

        if let Some(new_name) = &rename {
            working = working
                .rename(self.conn, new_name)
                .await
                .inspect_err(|e| warn!(%phase, error = %e, "Rename failed, aborting"))?;
            phase = ReconcilePhase::Renamed;
        }

        if let Some(target) = &relocate {
            working = working
                .relocate(self.conn, target)
                .await
                .inspect_err(|e| warn!(%phase, error = %e, "Move failed, aborting"))?;
            phase = ReconcilePhase::Moved;
        }

        if !changes.is_empty() {
            working = working
                .apply(self.conn, &changes)
                .await
                .inspect_err(|e| warn!(%phase, error = %e, "Attribute replace failed"))?;
            phase = ReconcilePhase::AttributesApplied;
        }

        let (final_path, result) = working.into_parts();
        let outcome = ReconcileOutcome {
            result,
            path: final_path,
            renamed: rename.is_some(),
            moved: relocate.is_some(),
            changed: changes
                .attribute_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        debug!(last_phase = %phase, "Reconciliation steps complete");
        info!(
            phase = %ReconcilePhase::Done,
            final_path = %outcome.path,
            renamed = outcome.renamed,
            moved = outcome.moved,
            changed = outcome.changed.len(),
            "Object reconciled"
        );

        Ok(outcome)
    }
}

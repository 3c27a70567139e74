//! Object lifecycle
//!
//! Creation and deletion of directory objects. Creating a user also sets its
//! initial credential and enables the account; if either step fails the
//! created object is left in place (disabled or without a credential) and
//! the failure is reported as [`DirectoryError::PartialLifecycle`].

use tracing::{info, instrument, warn};

use crate::config::LifecycleConfig;
use crate::error::{DirectoryError, DirectoryResult, LifecycleStage};
use crate::operation::{AttributeSet, ChangeSet};
use crate::path::DistinguishedPath;
use crate::result::OperationResult;
use crate::traits::DirectoryConnection;
use crate::types::ObjectKind;

/// Attribute holding the account-control flags.
pub const ACCOUNT_CONTROL_ATTRIBUTE: &str = "userAccountControl";

/// Creates and deletes directory objects over an injected connection.
pub struct ObjectLifecycleManager<'c, C: ?Sized> {
    conn: &'c C,
    config: LifecycleConfig,
}

impl<'c, C> ObjectLifecycleManager<'c, C>
where
    C: DirectoryConnection + ?Sized,
{
    /// Create a lifecycle manager.
    pub fn new(conn: &'c C, config: LifecycleConfig) -> Self {
        Self { conn, config }
    }

    /// Create an object of `kind` at `path`.
    ///
    /// Returns the result of the last step performed (the enable step for
    /// users, the create itself otherwise).
    #[instrument(skip(self, path, attributes), fields(path = %path))]
    pub async fn create(
        &self,
        path: &DistinguishedPath,
        kind: ObjectKind,
        attributes: AttributeSet,
    ) -> DirectoryResult<OperationResult> {
        path.validate_kind(kind)?;

        let password = match kind {
            ObjectKind::User => Some(self.config.initial_password.as_deref().ok_or_else(|| {
                DirectoryError::invalid_configuration(
                    "initial_password is required to create user accounts",
                )
            })?),
            ObjectKind::OrganizationalUnit => None,
        };

        let created = self
            .conn
            .create(path, kind.object_classes(), &attributes)
            .await?
            .into_result()?;
        info!(%kind, "Directory object created");

        let Some(password) = password else {
            return Ok(created);
        };

        self.conn
            .set_password(path, password)
            .await
            .and_then(OperationResult::into_result)
            .map_err(|e| partial(path, LifecycleStage::SetCredential, e))?;

        let enable = ChangeSet::new().with_replace(
            ACCOUNT_CONTROL_ATTRIBUTE,
            self.config.enabled_account_control,
        );
        let enabled = self
            .conn
            .modify(path, &enable)
            .await
            .and_then(OperationResult::into_result)
            .map_err(|e| partial(path, LifecycleStage::EnableAccount, e))?;

        info!("User account credentialed and enabled");
        Ok(enabled)
    }

    /// Delete the object at `path`.
    #[instrument(skip(self, path), fields(path = %path))]
    pub async fn delete(&self, path: &DistinguishedPath) -> DirectoryResult<OperationResult> {
        let result = self.conn.delete(path).await?.into_result()?;
        info!("Directory object deleted");
        Ok(result)
    }
}

fn partial(
    path: &DistinguishedPath,
    stage: LifecycleStage,
    source: DirectoryError,
) -> DirectoryError {
    warn!(
        path = %path,
        %stage,
        error = %source,
        "Object created but post-create step failed; leaving it in place"
    );
    DirectoryError::PartialLifecycle {
        path: path.to_string(),
        stage,
        source: Box::new(source),
    }
}

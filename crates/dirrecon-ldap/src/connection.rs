//! LDAP directory connection
//!
//! [`DirectoryConnection`] over LDAP v3, plus the credential check and the
//! listing queries used by callers that manage AD objects.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use dirrecon_core::config::DirectoryConfig;
use dirrecon_core::error::{DirectoryError, DirectoryResult};
use dirrecon_core::operation::{AttributeSet, AttributeValue, ChangeSet};
use dirrecon_core::path::{DistinguishedPath, Rdn};
use dirrecon_core::result::{OperationResult, ResultCode};
use dirrecon_core::traits::DirectoryConnection;
use dirrecon_core::types::OperationType;

use crate::config::LdapConfig;
use crate::password::build_password_modify;

/// A directory object returned by the listing queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the object.
    pub dn: String,
    /// Text attributes.
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Attributes whose values are not valid UTF-8 (e.g. `objectGUID`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary_attributes: BTreeMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// First value of a text attribute, matched case-insensitively.
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs.into_iter().collect(),
            binary_attributes: entry.bin_attrs.into_iter().collect(),
        }
    }
}

/// LDAP implementation of [`DirectoryConnection`].
pub struct LdapDirectory {
    /// Configuration.
    config: LdapConfig,

    /// Cached LDAP connection (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,

    /// Whether the connection has been disposed.
    disposed: Arc<RwLock<bool>>,
}

impl LdapDirectory {
    /// Create a new LDAP directory with the given configuration.
    ///
    /// No connection is made until the first operation.
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;
        config.tls.validate_security();

        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
            disposed: Arc::new(RwLock::new(false)),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        if *self.disposed.read().await {
            return Err(DirectoryError::invalid_configuration(
                "Directory connection has been disposed",
            ));
        }

        // Try to reuse existing connection
        let cached = self.connection.read().await.clone();

        let mut ldap = match cached {
            Some(conn) => conn,
            None => {
                let bind_password = self.config.bind_password.as_deref().unwrap_or("");
                let conn = self.connect(&self.config.bind_dn, bind_password).await?;
                *self.connection.write().await = Some(conn.clone());
                conn
            }
        };

        if let Some(timeout) = self.config.connection.operation_timeout() {
            ldap.with_timeout(timeout);
        }
        Ok(ldap)
    }

    /// Open a new connection and bind as `bind_dn`.
    async fn connect(&self, bind_dn: &str, password: &str) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout())
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(!self.config.tls.verify_certificate);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap.simple_bind(bind_dn, password).await.map_err(|e| {
            DirectoryError::connection_failed_with_source(
                format!("LDAP bind failed for {bind_dn}"),
                e,
            )
        })?;

        if result.rc != 0 {
            return Err(DirectoryError::from_result(OperationResult::from_code(
                result.rc,
                bind_dn,
                result.text,
                OperationType::Bind,
            )));
        }

        info!(host = %self.config.host, "LDAP connection established successfully");
        Ok(ldap)
    }

    /// Unbind and refuse further operations.
    pub async fn dispose(&self) -> DirectoryResult<()> {
        *self.disposed.write().await = true;

        let mut conn_guard = self.connection.write().await;
        if let Some(mut ldap) = conn_guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }

        info!("LDAP directory connection disposed");
        Ok(())
    }

    /// All user objects under the configured base.
    pub async fn list_users(&self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.search_entries(&self.config.user_filter).await
    }

    /// All organizational units under the configured base.
    pub async fn list_organizational_units(&self) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.search_entries(&self.config.ou_filter).await
    }

    #[instrument(skip(self))]
    async fn search_entries(&self, filter: &str) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut ldap = self.get_connection().await?;
        let base = &self.config.base_dn;

        debug!(base_dn = %base, "Searching LDAP");

        let result = ldap
            .search(base, Scope::Subtree, filter, vec!["*"])
            .await
            .map_err(|e| transport_error("search", base, e))?;

        let (entries, res) = result.success().map_err(|e| match e {
            LdapError::LdapResult { result } => {
                DirectoryError::from_result(OperationResult::from_code(
                    result.rc,
                    base.as_str(),
                    result.text,
                    OperationType::Search,
                ))
            }
            other => transport_error("search", base, other),
        })?;
        debug!(rc = res.rc, "Search finished");

        let entries: Vec<DirectoryEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from)
            .collect();

        info!(total_found = entries.len(), "LDAP search completed");
        Ok(entries)
    }
}

/// Transport-level failure of an LDAP request.
fn transport_error(operation: &str, target: &str, e: LdapError) -> DirectoryError {
    DirectoryError::connection_failed_with_source(
        format!("LDAP {operation} on '{target}' failed"),
        e,
    )
}

/// Convert an LDAP result into a directory result; non-success becomes an error.
fn operation_result(
    result: LdapResult,
    path: &DistinguishedPath,
    operation: OperationType,
) -> DirectoryResult<OperationResult> {
    OperationResult::from_code(result.rc, path.to_string(), result.text, operation).into_result()
}

/// Interpret the result code of a compare request.
fn compare_outcome(result: LdapResult, path: &DistinguishedPath) -> DirectoryResult<bool> {
    match ResultCode::from(result.rc) {
        ResultCode::CompareTrue => Ok(true),
        ResultCode::CompareFalse => Ok(false),
        code if code.is_attribute_mismatch() => {
            debug!(path = %path, rc = result.rc, "Attribute not comparable, treating as unequal");
            Ok(false)
        }
        _ => Err(DirectoryError::from_result(OperationResult::from_code(
            result.rc,
            path.to_string(),
            result.text,
            OperationType::Compare,
        ))),
    }
}

/// Attribute name and values in the form `ldap3` sends them.
fn octet_set(value: &AttributeValue) -> HashSet<Vec<u8>> {
    value.to_octets().into_iter().collect()
}

fn replace_mods(changes: &ChangeSet) -> Vec<Mod<Vec<u8>>> {
    changes
        .iter()
        .map(|change| Mod::Replace(change.name.as_bytes().to_vec(), octet_set(&change.value)))
        .collect()
}

fn add_attributes(
    object_classes: &[&str],
    attributes: &AttributeSet,
) -> Vec<(Vec<u8>, HashSet<Vec<u8>>)> {
    let classes = object_classes.iter().map(|c| c.as_bytes().to_vec()).collect();
    let mut attrs = vec![(b"objectClass".to_vec(), classes)];

    for (name, value) in attributes.iter() {
        if name.eq_ignore_ascii_case("objectClass") {
            continue;
        }
        let values = octet_set(value);
        if !values.is_empty() {
            attrs.push((name.as_bytes().to_vec(), values));
        }
    }
    attrs
}

#[async_trait]
impl DirectoryConnection for LdapDirectory {
    #[instrument(skip(self, path, value), fields(path = %path))]
    async fn compare(
        &self,
        path: &DistinguishedPath,
        attribute: &str,
        value: &AttributeValue,
    ) -> DirectoryResult<bool> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        for octets in value.to_octets() {
            let result = ldap
                .compare(&dn, attribute, octets)
                .await
                .map_err(|e| transport_error("compare", &dn, e))?;
            if !compare_outcome(result.0, path)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[instrument(skip(self, path, changes), fields(path = %path))]
    async fn modify(
        &self,
        path: &DistinguishedPath,
        changes: &ChangeSet,
    ) -> DirectoryResult<OperationResult> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        debug!(attributes = ?changes.attribute_names(), "Replacing attributes");

        let result = ldap
            .modify(&dn, replace_mods(changes))
            .await
            .map_err(|e| transport_error("modify", &dn, e))?;

        let result = operation_result(result, path, OperationType::Modify)?;
        info!("LDAP entry updated successfully");
        Ok(result)
    }

    #[instrument(skip(self, path, new_rdn), fields(path = %path, new_rdn = %new_rdn))]
    async fn rename(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
    ) -> DirectoryResult<OperationResult> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        let result = ldap
            .modifydn(&dn, &new_rdn.to_string(), true, None)
            .await
            .map_err(|e| transport_error("modifyDN", &dn, e))?;

        let result = operation_result(result, path, OperationType::ModifyDn)?;
        info!("LDAP entry renamed successfully");
        Ok(result)
    }

    #[instrument(
        skip(self, path, new_rdn, new_parent),
        fields(path = %path, new_parent = %new_parent)
    )]
    async fn move_to(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
        new_parent: &DistinguishedPath,
    ) -> DirectoryResult<OperationResult> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();
        let superior = new_parent.to_string();

        let result = ldap
            .modifydn(&dn, &new_rdn.to_string(), true, Some(superior.as_str()))
            .await
            .map_err(|e| transport_error("modifyDN", &dn, e))?;

        let result = operation_result(result, path, OperationType::ModifyDn)?;
        info!("LDAP entry moved successfully");
        Ok(result)
    }

    #[instrument(skip(self, path, attributes), fields(path = %path))]
    async fn create(
        &self,
        path: &DistinguishedPath,
        object_classes: &[&str],
        attributes: &AttributeSet,
    ) -> DirectoryResult<OperationResult> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        debug!(object_classes = ?object_classes, "Creating LDAP entry");

        let result = ldap
            .add(&dn, add_attributes(object_classes, attributes))
            .await
            .map_err(|e| transport_error("add", &dn, e))?;

        let result = operation_result(result, path, OperationType::Add)?;
        info!("LDAP entry created successfully");
        Ok(result)
    }

    #[instrument(skip(self, path), fields(path = %path))]
    async fn delete(&self, path: &DistinguishedPath) -> DirectoryResult<OperationResult> {
        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        let result = ldap
            .delete(&dn)
            .await
            .map_err(|e| transport_error("delete", &dn, e))?;

        let result = operation_result(result, path, OperationType::Delete)?;
        info!("LDAP entry deleted successfully");
        Ok(result)
    }

    #[instrument(skip(self, path, password), fields(path = %path))]
    async fn set_password(
        &self,
        path: &DistinguishedPath,
        password: &str,
    ) -> DirectoryResult<OperationResult> {
        let (attribute, encoded) = build_password_modify(password, self.config.is_encrypted())?;

        let mut ldap = self.get_connection().await?;
        let dn = path.to_string();

        let mods = vec![Mod::Replace(
            attribute.as_bytes().to_vec(),
            HashSet::from([encoded]),
        )];
        let result = ldap
            .modify(&dn, mods)
            .await
            .map_err(|e| transport_error("modify", &dn, e))?;

        let result = operation_result(result, path, OperationType::Modify)?;
        info!("Password set");
        Ok(result)
    }

    #[instrument(skip(self, secret))]
    async fn check_credentials(&self, principal: &str, secret: &str) -> bool {
        // An empty simple bind is an anonymous bind and would succeed.
        if secret.is_empty() {
            warn!("Credential check with empty secret rejected");
            return false;
        }

        let bind_name = self.config.principal(principal);
        match self.connect(&bind_name, secret).await {
            Ok(mut ldap) => {
                if let Err(e) = ldap.unbind().await {
                    debug!(error = %e, "Error during LDAP unbind");
                }
                info!(principal = %bind_name, "Credentials verified");
                true
            }
            Err(e) => {
                warn!(principal = %bind_name, error = %e, "Credential check failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config.redacted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ldap_result(rc: u32, text: &str) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: text.to_string(),
            refs: vec![],
            ctrls: vec![],
        }
    }

    fn test_path() -> DistinguishedPath {
        DistinguishedPath::parse("CN=test4,OU=IT,DC=example,DC=com").unwrap()
    }

    fn test_directory() -> LdapDirectory {
        LdapDirectory::new(
            LdapConfig::new("dc01.example.com", "DC=example,DC=com", "admin@example.com")
                .with_password("secret")
                .with_domain("example.com"),
        )
        .unwrap()
    }

    #[test]
    fn test_operation_result_success() {
        let result =
            operation_result(ldap_result(0, ""), &test_path(), OperationType::Modify).unwrap();

        assert!(result.is_success());
        assert_eq!(result.description, "success");
        assert_eq!(result.target_path, "CN=test4,OU=IT,DC=example,DC=com");
        assert_eq!(result.operation, OperationType::Modify);
    }

    #[test]
    fn test_operation_result_failure_keeps_server_message() {
        let err = operation_result(
            ldap_result(19, "0000052D: AtrErr: DSID-03191083"),
            &test_path(),
            OperationType::Modify,
        )
        .unwrap_err();

        let result = err.result().unwrap();
        assert_eq!(result.description, "constraintViolation");
        assert!(result.message.contains("0000052D"));
    }

    #[test]
    fn test_operation_result_well_known_codes() {
        let not_found =
            operation_result(ldap_result(32, ""), &test_path(), OperationType::Delete).unwrap_err();
        assert!(matches!(not_found, DirectoryError::ObjectNotFound { .. }));

        let exists =
            operation_result(ldap_result(68, ""), &test_path(), OperationType::Add).unwrap_err();
        assert!(matches!(exists, DirectoryError::ObjectAlreadyExists { .. }));

        let busy =
            operation_result(ldap_result(51, ""), &test_path(), OperationType::Modify).unwrap_err();
        assert!(busy.is_transient());
    }

    #[test]
    fn test_compare_outcome() {
        assert!(compare_outcome(ldap_result(6, ""), &test_path()).unwrap());
        assert!(!compare_outcome(ldap_result(5, ""), &test_path()).unwrap());
        assert!(!compare_outcome(ldap_result(16, ""), &test_path()).unwrap());
        assert!(!compare_outcome(ldap_result(17, ""), &test_path()).unwrap());

        let err = compare_outcome(ldap_result(32, ""), &test_path()).unwrap_err();
        assert!(matches!(err, DirectoryError::ObjectNotFound { .. }));
    }

    #[test]
    fn test_replace_mods() {
        let changes = ChangeSet::new()
            .with_replace("Sn", "Lee")
            .with_replace("userAccountControl", 512u32);

        let mods = replace_mods(&changes);
        assert_eq!(mods.len(), 2);
        match &mods[1] {
            Mod::Replace(name, values) => {
                assert_eq!(name, b"userAccountControl");
                assert!(values.contains(b"512".as_slice()));
            }
            _ => panic!("expected replace"),
        }
    }

    #[test]
    fn test_add_attributes_object_classes_first() {
        let attrs = AttributeSet::new()
            .with("objectClass", "ignored")
            .with("sAMAccountName", "jdoe")
            .with("otherMobile", vec!["1", "2"]);

        let added = add_attributes(&["user", "posixGroup", "top"], &attrs);

        assert_eq!(added.len(), 3);
        assert_eq!(added[0].0, b"objectClass");
        assert_eq!(added[0].1.len(), 3);
        assert!(added[0].1.contains(b"posixGroup".as_slice()));
        assert_eq!(added[2].1.len(), 2);
    }

    #[test]
    fn test_directory_entry_from_search_entry() {
        let entry = SearchEntry {
            dn: "CN=test4,OU=IT,DC=example,DC=com".to_string(),
            attrs: HashMap::from([
                ("sAMAccountName".to_string(), vec!["test4".to_string()]),
                ("mobile".to_string(), vec!["111".to_string()]),
            ]),
            bin_attrs: HashMap::from([("objectGUID".to_string(), vec![vec![1, 2, 3]])]),
        };

        let entry = DirectoryEntry::from(entry);
        assert_eq!(entry.first("samaccountname"), Some("test4"));
        assert_eq!(entry.binary_attributes["objectGUID"], vec![vec![1, 2, 3]]);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["dn"], "CN=test4,OU=IT,DC=example,DC=com");
        assert_eq!(json["attributes"]["mobile"][0], "111");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err =
            LdapDirectory::new(LdapConfig::new("", "DC=example,DC=com", "admin")).unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", test_directory());
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_check_credentials_rejects_empty_secret() {
        assert!(!test_directory().check_credentials("jdoe", "").await);
    }

    #[tokio::test]
    async fn test_set_password_requires_encryption() {
        let err = test_directory()
            .set_password(&test_path(), "Initial#Pass1")
            .await
            .unwrap_err();

        assert!(matches!(err, DirectoryError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("SSL"));
    }

    #[tokio::test]
    async fn test_disposed_directory_refuses_operations() {
        let directory = test_directory();
        directory.dispose().await.unwrap();

        let err = directory.delete(&test_path()).await.unwrap_err();
        assert!(err.to_string().contains("disposed"));
    }
}

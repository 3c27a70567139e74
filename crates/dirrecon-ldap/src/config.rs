//! LDAP directory configuration
//!
//! Configuration types for LDAP/Active Directory connections.

use dirrecon_core::config::{ConnectionSettings, DirectoryConfig, TlsConfig, REDACTED};
use dirrecon_core::error::{DirectoryError, DirectoryResult};
use dirrecon_core::path::DistinguishedPath;
use serde::{Deserialize, Serialize};

/// Configuration for an LDAP directory connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Search base for listing queries (e.g., "DC=example,DC=com").
    pub base_dn: String,

    /// Service account used for the bind (e.g., "admin@example.com").
    pub bind_dn: String,

    /// Service account password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Domain appended to bare account names in credential checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,

    /// LDAP filter selecting user objects.
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// LDAP filter selecting organizational units.
    #[serde(default = "default_ou_filter")]
    pub ou_filter: String,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| REDACTED))
            .field("domain", &self.domain)
            .field("connection", &self.connection)
            .field("tls", &self.tls)
            .field("user_filter", &self.user_filter)
            .field("ou_filter", &self.ou_filter)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_user_filter() -> String {
    "(objectClass=user)".to_string()
}

fn default_ou_filter() -> String {
    "(objectClass=organizationalUnit)".to_string()
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            domain: None,
            connection: ConnectionSettings::default(),
            tls: TlsConfig::default(),
            user_filter: default_user_filter(),
            ou_filter: default_ou_filter(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set the domain used to qualify bare account names.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Whether traffic to the server is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.use_ssl || self.use_starttls
    }

    /// Bind name for a credential check.
    ///
    /// Names that already carry a domain (`user@domain`, `DOMAIN\user`) or
    /// are a DN pass through unchanged; bare names get `@domain` appended
    /// when a domain is configured.
    pub fn principal(&self, name: &str) -> String {
        let qualified = name.contains('@') || name.contains('\\') || name.contains('=');
        match &self.domain {
            Some(domain) if !qualified && !domain.is_empty() => format!("{name}@{domain}"),
            _ => name.to_string(),
        }
    }
}

impl DirectoryConfig for LdapConfig {
    fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::invalid_configuration("host is required"));
        }

        if self.base_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("base_dn is required"));
        }
        DistinguishedPath::parse(&self.base_dn).map_err(|e| {
            DirectoryError::invalid_configuration(format!("base_dn is not a valid path: {e}"))
        })?;

        if self.bind_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("bind_dn is required"));
        }

        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }

        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some(REDACTED.to_string());
        }
        config
    }
}

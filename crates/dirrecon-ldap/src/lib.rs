//! # LDAP Directory
//!
//! LDAP/Active Directory implementation of the directory reconciliation
//! core's [`DirectoryConnection`](dirrecon_core::traits::DirectoryConnection).
//!
//! ## Features
//!
//! - LDAP v3 protocol support via `ldap3`
//! - SSL/TLS and STARTTLS
//! - AD `unicodePwd` password encoding
//! - Credential checks and user / organizational unit listing
//!
//! ## Example
//!
//! ```ignore
//! use dirrecon_core::prelude::*;
//! use dirrecon_ldap::{LdapConfig, LdapDirectory};
//!
//! let config = LdapConfig::new(
//!     "dc01.example.com",
//!     "DC=example,DC=com",
//!     "admin@example.com",
//! )
//! .with_password("secret")
//! .with_ssl();
//!
//! let directory = LdapDirectory::new(config)?;
//! let engine = ReconciliationEngine::new(&directory);
//! let path = DistinguishedPath::parse("CN=test4,OU=IT,DC=example,DC=com")?;
//! engine.update(&path, DesiredState::new().with("Sn", "Lee")).await?;
//! ```

pub mod config;
pub mod connection;
pub mod password;

// Re-exports
pub use config::LdapConfig;
pub use connection::{DirectoryEntry, LdapDirectory};

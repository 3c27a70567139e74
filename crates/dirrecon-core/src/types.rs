//! Directory type definitions
//!
//! Enums for object kinds and directory operation types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of directory object managed by this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A user account, named by `CN`.
    User,
    /// An organizational unit, named by `OU`.
    OrganizationalUnit,
}

impl ObjectKind {
    /// Get all object kinds.
    #[must_use]
    pub fn all() -> &'static [ObjectKind] {
        &[ObjectKind::User, ObjectKind::OrganizationalUnit]
    }

    /// The attribute type that names objects of this kind.
    #[must_use]
    pub fn naming_attribute(&self) -> &'static str {
        match self {
            ObjectKind::User => "CN",
            ObjectKind::OrganizationalUnit => "OU",
        }
    }

    /// Object classes written when creating an object of this kind.
    #[must_use]
    pub fn object_classes(&self) -> &'static [&'static str] {
        match self {
            ObjectKind::User => &["user", "posixGroup", "top"],
            ObjectKind::OrganizationalUnit => &["organizationalUnit", "posixGroup", "top"],
        }
    }

    /// Infer the kind from a naming attribute type (case-insensitive).
    #[must_use]
    pub fn from_naming_attribute(attribute_type: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.naming_attribute().eq_ignore_ascii_case(attribute_type))
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::User => "user",
            ObjectKind::OrganizationalUnit => "ou",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = ParseObjectKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(ObjectKind::User),
            "ou" | "organizationalunit" | "organizational_unit" => {
                Ok(ObjectKind::OrganizationalUnit)
            }
            _ => Err(ParseObjectKindError(s.to_string())),
        }
    }
}

/// Error parsing object kind from string.
#[derive(Debug, Clone)]
pub struct ParseObjectKindError(String);

impl fmt::Display for ParseObjectKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid object kind '{}', expected one of: user, ou",
            self.0
        )
    }
}

impl std::error::Error for ParseObjectKindError {}

/// Type of directory operation that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Entry creation.
    Add,
    /// Entry deletion.
    Delete,
    /// Attribute modification (including credential changes).
    Modify,
    /// Rename or move (modify DN).
    ModifyDn,
    /// Attribute value assertion.
    Compare,
    /// Bind / credential check.
    Bind,
    /// Search (listing queries).
    Search,
    /// Nothing needed to be done.
    NoOp,
}

impl OperationType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Add => "add",
            OperationType::Delete => "delete",
            OperationType::Modify => "modify",
            OperationType::ModifyDn => "modify_dn",
            OperationType::Compare => "compare",
            OperationType::Bind => "bind",
            OperationType::Search => "search",
            OperationType::NoOp => "no_op",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Desired object state
//!
//! What a reconciliation should converge an object to: ordinary attribute
//! values plus two structural directives (rename, relocate) that are kept
//! apart from the attribute data so they can never leak into a replace call.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::operation::{AttributeSet, AttributeValue};
use crate::path::DistinguishedPath;

/// Reserved key in flat attribute mappings that requests a rename.
pub const RENAME_KEY: &str = "name";

/// Reserved key in flat attribute mappings that requests a move.
pub const RELOCATE_KEY: &str = "DistinguishedName";

/// Desired state of a directory object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Ordinary attributes, compared and replaced in insertion order.
    #[serde(default)]
    pub attributes: AttributeSet,

    /// New value for the naming component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    /// Full target path. A move is issued whenever this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relocate: Option<DistinguishedPath>,
}

impl DesiredState {
    /// Create an empty desired state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a desired state from a flat mapping that may carry the reserved
    /// `name` and `DistinguishedName` keys.
    ///
    /// Reserved keys are matched case-insensitively and lifted out of the
    /// attribute data; their values must be single strings.
    pub fn from_attributes(attributes: AttributeSet) -> DirectoryResult<Self> {
        let mut state = Self::new();

        for (name, value) in attributes {
            if name.eq_ignore_ascii_case(RENAME_KEY) {
                state.rename = Some(reserved_string(&name, &value)?.to_string());
            } else if name.eq_ignore_ascii_case(RELOCATE_KEY) {
                let target = reserved_string(&name, &value)?;
                state.relocate = Some(DistinguishedPath::parse(target)?);
            } else {
                state.attributes.set(name, value);
            }
        }

        Ok(state)
    }

    /// Add a desired attribute.
    ///
    /// A string value under `name` becomes a rename and a parseable path
    /// under `DistinguishedName` becomes a relocation, as with
    /// [`DesiredState::from_attributes`]. Any other value under a reserved
    /// name is kept as an attribute and rejected when the state is diffed.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let name = name.into();
        let value = value.into();

        if name.eq_ignore_ascii_case(RENAME_KEY) {
            if let Some(new_name) = value.as_string() {
                self.rename = Some(new_name.to_string());
                return self;
            }
        } else if name.eq_ignore_ascii_case(RELOCATE_KEY) {
            if let Some(target) = value.as_string().and_then(|t| DistinguishedPath::parse(t).ok()) {
                self.relocate = Some(target);
                return self;
            }
        }

        self.attributes.set(name, value);
        self
    }

    /// Request a rename of the naming component.
    #[must_use]
    pub fn renamed_to(mut self, value: impl Into<String>) -> Self {
        self.rename = Some(value.into());
        self
    }

    /// Request a move to a full target path.
    #[must_use]
    pub fn relocated_to(mut self, target: DistinguishedPath) -> Self {
        self.relocate = Some(target);
        self
    }

    /// Whether nothing at all is requested.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.rename.is_none() && self.relocate.is_none()
    }
}

/// Whether `name` is one of the reserved structural keys.
pub fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(RENAME_KEY) || name.eq_ignore_ascii_case(RELOCATE_KEY)
}

fn reserved_string<'a>(name: &str, value: &'a AttributeValue) -> DirectoryResult<&'a str> {
    value.as_string().ok_or_else(|| {
        DirectoryError::invalid_configuration(format!(
            "reserved attribute '{name}' must be a single string value"
        ))
    })
}

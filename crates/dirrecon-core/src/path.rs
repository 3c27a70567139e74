//! Distinguished paths
//!
//! Parsing and composition of directory paths such as
//! `CN=test4,OU=IT,DC=example,DC=com`: an ordered, non-empty sequence of
//! relative names, most-specific first. The tail of a path names its parent
//! container.
//!
//! Values are unescaped on parse and re-escaped on display per RFC 4514, so
//! `DistinguishedPath::parse(&path.to_string())` yields `path` again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DirectoryError, DirectoryResult};
use crate::types::ObjectKind;

/// One `attributeType=value` component of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    attribute_type: String,
    value: String,
}

impl Rdn {
    /// Create a relative name from an attribute type and an unescaped value.
    pub fn new(attribute_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            value: value.into(),
        }
    }

    /// The attribute type, as written (e.g. `CN`).
    pub fn attribute_type(&self) -> &str {
        &self.attribute_type
    }

    /// The unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Same attribute type, new value.
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(self.attribute_type.clone(), value)
    }

    /// Parse a single `type=value` component.
    fn parse_component(raw: &str) -> Result<Self, String> {
        let (attribute_type, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("component '{}' is missing '='", raw.trim()))?;

        let attribute_type = attribute_type.trim();
        if attribute_type.is_empty() {
            return Err(format!(
                "component '{}' has an empty attribute type",
                raw.trim()
            ));
        }
        if !attribute_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("invalid attribute type '{attribute_type}'"));
        }

        let value = unescape_value(trim_unescaped(value))?;
        if value.is_empty() {
            return Err(format!("component '{}' has an empty value", raw.trim()));
        }

        Ok(Self::new(attribute_type, value))
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute_type, escape_value(&self.value))
    }
}

/// Full path of a directory object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedPath {
    components: Vec<Rdn>,
}

impl DistinguishedPath {
    /// Build a path from components, most-specific first.
    pub fn new(components: Vec<Rdn>) -> DirectoryResult<Self> {
        if components.is_empty() {
            return Err(DirectoryError::malformed_path(
                "",
                "path must have at least one component",
            ));
        }
        Ok(Self { components })
    }

    /// Parse a path string.
    ///
    /// Fails with [`DirectoryError::MalformedPath`] unless the text splits
    /// into at least one `attributeType=value` component.
    pub fn parse(text: &str) -> DirectoryResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DirectoryError::malformed_path(text, "path is empty"));
        }

        let components = split_unescaped(trimmed, ',')
            .into_iter()
            .map(Rdn::parse_component)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| DirectoryError::malformed_path(text, reason))?;

        Ok(Self { components })
    }

    /// The first (naming) component.
    pub fn rdn(&self) -> &Rdn {
        &self.components[0]
    }

    /// Attribute type of the naming component (e.g. `CN`, `OU`).
    pub fn naming_attribute(&self) -> &str {
        self.rdn().attribute_type()
    }

    /// Value of the naming component.
    pub fn naming_value(&self) -> &str {
        self.rdn().value()
    }

    /// All components, most-specific first.
    pub fn components(&self) -> &[Rdn] {
        &self.components
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false; paths are never empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether the path has no parent container.
    pub fn is_root(&self) -> bool {
        self.components.len() == 1
    }

    /// The parent container: every component except the first.
    pub fn parent(&self) -> DirectoryResult<Self> {
        if self.is_root() {
            return Err(DirectoryError::RootPath {
                path: self.to_string(),
            });
        }
        Ok(Self {
            components: self.components[1..].to_vec(),
        })
    }

    /// The path an object gets after renaming its naming component in place.
    ///
    /// Only the value of the first component changes; its attribute type and
    /// the parent are kept.
    pub fn compose_after_rename(&self, new_value: &str) -> DirectoryResult<Self> {
        if new_value.trim().is_empty() {
            return Err(DirectoryError::malformed_path(
                self.to_string(),
                "new name must not be empty",
            ));
        }
        let mut components = self.components.clone();
        components[0] = self.rdn().with_value(new_value);
        Ok(Self { components })
    }

    /// Split a whole target path into the relative name and new parent the
    /// move primitive takes.
    pub fn split_for_move(&self) -> DirectoryResult<(Rdn, DistinguishedPath)> {
        Ok((self.rdn().clone(), self.parent()?))
    }

    /// The path of `rdn` placed directly under this container.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.push(rdn);
        components.extend(self.components.iter().cloned());
        Self { components }
    }

    /// Check that the naming attribute fits the object kind.
    pub fn validate_kind(&self, kind: ObjectKind) -> DirectoryResult<()> {
        if self
            .naming_attribute()
            .eq_ignore_ascii_case(kind.naming_attribute())
        {
            Ok(())
        } else {
            Err(DirectoryError::NamingMismatch {
                path: self.to_string(),
                kind: kind.to_string(),
                expected: kind.naming_attribute().to_string(),
            })
        }
    }
}

impl fmt::Display for DistinguishedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for DistinguishedPath {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DistinguishedPath {
    type Error = DirectoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DistinguishedPath> for String {
    fn from(path: DistinguishedPath) -> Self {
        path.to_string()
    }
}

/// Split on `separator` wherever it is not backslash-escaped.
fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == separator {
            parts.push(&text[start..i]);
            start = i + ch.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Trim surrounding spaces, keeping a trailing space that is escaped.
///
/// A space is escaped only when an odd number of backslashes precede it;
/// `\\ ` is an escaped backslash followed by a plain space.
fn trim_unescaped(value: &str) -> &str {
    let value = value.trim_start();
    let bytes = value.as_bytes();
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b' ' {
        let backslashes = bytes[..end - 1]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &value[..end]
}

/// Resolve `\c` and `\hh` escapes in a value.
fn unescape_value(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let next = *bytes
            .get(i + 1)
            .ok_or_else(|| format!("dangling escape at end of '{raw}'"))?;
        let hex_pair = next.is_ascii_hexdigit()
            && bytes.get(i + 2).is_some_and(|b| b.is_ascii_hexdigit());

        if hex_pair {
            let byte = u8::from_str_radix(&raw[i + 1..i + 3], 16)
                .map_err(|e| format!("bad hex escape in '{raw}': {e}"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(next);
            i += 2;
        }
    }

    String::from_utf8(out).map_err(|_| format!("escaped value '{raw}' is not valid UTF-8"))
}

/// Escape special characters in a value per RFC 4514.
///
/// - Leading or trailing SPACE (escaped as \20)
/// - Leading # (escaped as \23)
/// - Characters: , + " \ < > ; = (escaped with backslash prefix)
/// - NUL character (escaped as \00)
fn escape_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len() * 2);
    let last = value.chars().count().saturating_sub(1);

    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if i == 0 || i == last => result.push_str("\\20"),
            '#' if i == 0 => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

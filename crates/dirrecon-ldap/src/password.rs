//! AD password operations using unicodePwd attribute encoding.
//!
//! Active Directory requires passwords to be set via the `unicodePwd` attribute
//! using a specific encoding:
//! 1. Surround the password with double quotes: `"password"`
//! 2. Encode the quoted string as UTF-16LE bytes
//!
//! The directory only accepts `unicodePwd` writes over an encrypted
//! connection.

use dirrecon_core::error::{DirectoryError, DirectoryResult};
use tracing::instrument;

/// Attribute holding the password of an AD account.
pub const PASSWORD_ATTRIBUTE: &str = "unicodePwd";

/// Encode a plaintext password for AD's unicodePwd attribute.
///
/// The password is surrounded with double quotes and then encoded as UTF-16LE.
///
/// # Errors
/// Returns an error if the password is empty.
#[instrument(skip(password))]
pub fn encode_ad_password(password: &str) -> DirectoryResult<Vec<u8>> {
    if password.is_empty() {
        return Err(DirectoryError::invalid_configuration(
            "Password cannot be empty",
        ));
    }

    let quoted = format!("\"{password}\"");
    let encoded: Vec<u8> = quoted.encode_utf16().flat_map(u16::to_le_bytes).collect();

    Ok(encoded)
}

/// Validate that the connection is suitable for password operations.
///
/// AD rejects `unicodePwd` modifications over unencrypted connections, so
/// this fails before anything is sent.
#[instrument]
pub fn validate_password_connection(encrypted: bool) -> DirectoryResult<()> {
    if !encrypted {
        return Err(DirectoryError::invalid_configuration(
            "LDAPS (SSL) or STARTTLS connection required for password operations. \
             AD rejects unicodePwd modifications over non-encrypted connections.",
        ));
    }
    Ok(())
}

/// Build the replace value for setting a new password.
///
/// Returns the attribute name and encoded value for an LDAP replace
/// operation on `unicodePwd`.
#[instrument(skip(password))]
pub fn build_password_modify(
    password: &str,
    encrypted: bool,
) -> DirectoryResult<(&'static str, Vec<u8>)> {
    validate_password_connection(encrypted)?;
    let encoded = encode_ad_password(password)?;
    Ok((PASSWORD_ATTRIBUTE, encoded))
}

//! Storage and wire types exchanged between the persistence layer and the
//! `rowseal` service.
//!
//! Every type is serialised as JSON, one message per line on the service's
//! stdin/stdout.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RowSealError;

/// Hex length of the stored IV column (12 bytes).
pub const IV_HEX_LEN: usize = 24;

/// Hex length of the stored tag column (16 bytes).
pub const TAG_HEX_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Stored columns
// ---------------------------------------------------------------------------

/// The three text columns persisted for an encrypted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRowPayload {
    /// Hex ciphertext, twice the packed plaintext length.
    pub ciphertext: String,
    /// Hex IV, exactly [`IV_HEX_LEN`] characters.
    pub iv: String,
    /// Hex authentication tag, exactly [`TAG_HEX_LEN`] characters.
    pub tag: String,
}

impl EncryptedRowPayload {
    /// Check the column shapes without touching any key material.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::Encoding`] naming the first offending column.
    pub fn validate_shape(&self) -> Result<(), RowSealError> {
        check_column("ciphertext", &self.ciphertext, None)?;
        check_column("iv", &self.iv, Some(IV_HEX_LEN))?;
        check_column("tag", &self.tag, Some(TAG_HEX_LEN))?;
        Ok(())
    }
}

fn check_column(name: &str, value: &str, exact: Option<usize>) -> Result<(), RowSealError> {
    if let Some(len) = exact {
        if value.len() != len {
            return Err(RowSealError::Encoding(format!(
                "{name} column must be {len} hex characters, got {}",
                value.len()
            )));
        }
    }
    if value.len() % 2 != 0 {
        return Err(RowSealError::Encoding(format!("{name} column has odd length")));
    }
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RowSealError::Encoding(format!(
            "{name} column contains non-hex characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A named text field as it crosses the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub value: String,
}

/// One request line read by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Seal an ordered field set for `row_id`.
    Encrypt {
        row_id: Uuid,
        fields: Vec<FieldEntry>,
        /// Optional associated data bound into the tag.
        #[serde(default)]
        context: Option<String>,
    },
    /// Open a stored payload for `row_id`.
    Decrypt {
        row_id: Uuid,
        payload: EncryptedRowPayload,
        #[serde(default)]
        context: Option<String>,
        /// Field names the caller expects, in order.
        #[serde(default)]
        expect: Option<Vec<String>>,
    },
    /// Liveness check.
    Health,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One response line written by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Successful outcome of any request.
    Ok(OkBody),
    /// Any failure. `message` is safe to expose to callers.
    Error { code: String, message: String },
}

/// Body of a successful [`Response`]; exactly one member is set per request kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EncryptedRowPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Response {
    /// Construct an error [`Response`] from a code and message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&RowSealError> for Response {
    fn from(e: &RowSealError) -> Self {
        Response::error(e.code(), e.to_string())
    }
}

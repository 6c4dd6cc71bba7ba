//! Error taxonomy shared by the crypto core and the service binary.

use thiserror::Error;

/// Every failure the row encryption layer can report.
///
/// Messages never carry plaintext, derived keys, or the master secret.
/// Variants map to suggested HTTP status codes for the calling layer:
/// - [`RowSealError::Configuration`] → 500
/// - [`RowSealError::InvalidKey`] → 500
/// - [`RowSealError::Encoding`] → 422
/// - [`RowSealError::Authentication`] → 422
/// - [`RowSealError::MalformedPayload`] → 422
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSealError {
    /// The master secret is missing or too short. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored column is not valid hex or has the wrong length.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The AEAD tag did not verify. Covers both corruption and tampering.
    #[error("authentication failed")]
    Authentication,

    /// A key of the wrong length reached the AEAD codec.
    #[error("invalid key length: expected 32 bytes, got {actual}")]
    InvalidKey { actual: usize },

    /// The authenticated plaintext does not follow the field framing.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl RowSealError {
    /// Returns the HTTP status code an outer layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            RowSealError::Configuration(_) | RowSealError::InvalidKey { .. } => 500,
            RowSealError::Encoding(_)
            | RowSealError::Authentication
            | RowSealError::MalformedPayload(_) => 422,
        }
    }

    /// Short machine-readable code, used in protocol error responses.
    pub fn code(&self) -> &'static str {
        match self {
            RowSealError::Configuration(_) => "configuration_error",
            RowSealError::Encoding(_) => "encoding_error",
            RowSealError::Authentication => "authentication_error",
            RowSealError::InvalidKey { .. } => "invalid_key",
            RowSealError::MalformedPayload(_) => "malformed_payload",
        }
    }

    /// `true` when the stored row itself is suspect and needs investigation.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            RowSealError::Encoding(_)
                | RowSealError::Authentication
                | RowSealError::MalformedPayload(_)
        )
    }
}

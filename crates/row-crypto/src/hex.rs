//! Lowercase hex encoding for the text storage columns.

use common::RowSealError;

/// Encode `bytes` as lowercase hex. Total and deterministic.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string back into bytes.
///
/// # Errors
///
/// Returns [`RowSealError::Encoding`] on odd length or non-hex characters.
pub fn decode(text: &str) -> Result<Vec<u8>, RowSealError> {
    hex::decode(text).map_err(encoding_error)
}

/// Decode a hex string that must hold exactly `N` bytes.
///
/// # Errors
///
/// Returns [`RowSealError::Encoding`] on malformed hex or a length other than `N`.
pub fn decode_array<const N: usize>(text: &str) -> Result<[u8; N], RowSealError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out).map_err(encoding_error)?;
    Ok(out)
}

fn encoding_error(e: hex::FromHexError) -> RowSealError {
    // FromHexError only describes positions and characters, never content.
    RowSealError::Encoding(e.to_string())
}

//! AES-256-GCM-SIV seal/open over opaque byte buffers with a detached tag.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) takes a 256-bit key, a
//! 96-bit nonce and yields a 128-bit tag. Ciphertext length equals plaintext
//! length; the tag is stored in its own column. A repeated nonce under the same
//! key only reveals plaintext equality instead of breaking authentication.
//!
//! IVs are never cached here; every [`generate_iv`] call draws fresh bytes from
//! the OS CSPRNG.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256GcmSiv, Nonce, Tag,
};
use common::RowSealError;
use zeroize::Zeroizing;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the IV (12 bytes = 96 bits).
pub const IV_LEN: usize = 12;

/// Byte length of the authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Output of [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Encrypted bytes, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Detached authentication tag.
    pub tag: [u8; TAG_LEN],
}

/// Draw a fresh random IV from the OS CSPRNG.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `key` and `iv`, authenticating `associated_data`.
///
/// Deterministic for identical inputs.
///
/// # Errors
///
/// Returns [`RowSealError::InvalidKey`] if `key` is not [`KEY_LEN`] bytes.
pub fn seal(
    key: &[u8],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
    associated_data: Option<&[u8]>,
) -> Result<Sealed, RowSealError> {
    let cipher = build_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(
            Nonce::from_slice(iv),
            associated_data.unwrap_or_default(),
            &mut buffer,
        )
        // Only reachable for plaintexts beyond the AEAD's 2^36-byte limit.
        .map_err(|_| RowSealError::MalformedPayload("plaintext too large to seal".into()))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok(Sealed {
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verify `tag` and decrypt `ciphertext`.
///
/// The plaintext is only handed back after the tag verifies; the returned
/// buffer is zeroed when dropped.
///
/// # Errors
///
/// Returns [`RowSealError::InvalidKey`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`RowSealError::Authentication`] on wrong key, IV, associated data,
/// or any modified ciphertext/tag byte.
pub fn open(
    key: &[u8],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
    associated_data: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, RowSealError> {
    let cipher = build_cipher(key)?;
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            associated_data.unwrap_or_default(),
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| RowSealError::Authentication)?;
    Ok(buffer)
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, RowSealError> {
    if key.len() != KEY_LEN {
        return Err(RowSealError::InvalidKey { actual: key.len() });
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| RowSealError::InvalidKey { actual: key.len() })
}

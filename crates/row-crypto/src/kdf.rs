//! Per-row key derivation from the process-wide master secret.
//!
//! # Lifecycle
//!
//! 1. At startup the service decodes the configured secret into a
//!    [`MasterKey`]; anything shorter than [`MIN_MASTER_KEY_LEN`] is rejected.
//! 2. The master key lives only in memory inside a [`KeyDerivationService`],
//!    shared read-only through an `Arc` by every caller.
//! 3. Each encrypt/decrypt call derives a [`RowKey`] with HKDF-SHA256 over the
//!    row's UUID and drops it before returning.
//!
//! # Security invariants
//!
//! - Neither key type is ever written to disk, logged, or printed; both are
//!   zeroed on drop and redact their `Debug` output.
//! - Derivation is deterministic: decryption rebuilds the exact key used at
//!   encryption time from the same row id.

use std::sync::Arc;

use common::RowSealError;
use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aead::KEY_LEN;

/// Minimum accepted master secret length in bytes.
pub const MIN_MASTER_KEY_LEN: usize = 32;

/// HKDF salt; separates row keys from any other use of the same secret.
const ROW_KEY_SALT: &[u8] = b"rowseal/master-salt/v1";

/// Prefix of the HKDF info string; the row UUID bytes follow it.
const ROW_KEY_INFO: &[u8] = b"rowseal/row-key/v1:";

/// The process-wide master secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey(Box<[u8]>);

impl MasterKey {
    /// Validate and take ownership of the secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::Configuration`] if the secret is empty or
    /// shorter than [`MIN_MASTER_KEY_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RowSealError> {
        if bytes.is_empty() {
            return Err(RowSealError::Configuration("master key is missing".into()));
        }
        if bytes.len() < MIN_MASTER_KEY_LEN {
            return Err(RowSealError::Configuration(format!(
                "master key must be at least {MIN_MASTER_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes.into()))
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: an empty key never passes [`MasterKey::from_bytes`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// A 256-bit key valid for one row and one call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RowKey([u8; KEY_LEN]);

impl RowKey {
    /// Raw key bytes, for handing straight to the AEAD codec.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RowKey([REDACTED])")
    }
}

/// Derives [`RowKey`]s from a shared [`MasterKey`].
///
/// Cloning is cheap and all clones share the same read-only secret, so the
/// service can be handed to any number of threads without locking.
#[derive(Clone, Debug)]
pub struct KeyDerivationService {
    master: Arc<MasterKey>,
}

impl KeyDerivationService {
    /// Build the service around an already validated master key.
    pub fn new(master: MasterKey) -> Self {
        Self {
            master: Arc::new(master),
        }
    }

    /// Validate raw secret bytes and build the service in one step.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::Configuration`] for a missing or short secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, RowSealError> {
        MasterKey::from_bytes(secret).map(Self::new)
    }

    /// Derive the key for `row_id`.
    ///
    /// HKDF-SHA256 with the master key as input keying material and the
    /// UUID's 16 canonical bytes in the info string.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::Configuration`] if HKDF refuses the output
    /// length, which cannot happen for a 32-byte output.
    pub fn derive_row_key(&self, row_id: Uuid) -> Result<RowKey, RowSealError> {
        let hk = Hkdf::<Sha256>::new(Some(ROW_KEY_SALT), &self.master.0);

        let mut info = Zeroizing::new(Vec::with_capacity(ROW_KEY_INFO.len() + 16));
        info.extend_from_slice(ROW_KEY_INFO);
        info.extend_from_slice(row_id.as_bytes());

        let mut okm = [0u8; KEY_LEN];
        hk.expand(&info, &mut okm).map_err(expand_error)?;
        let key = RowKey(okm);
        okm.zeroize();
        Ok(key)
    }
}

/// HKDF-SHA256 only rejects outputs longer than 255 hash blocks.
fn expand_error(_: hkdf::InvalidLength) -> RowSealError {
    RowSealError::Configuration("row key derivation failed: HKDF output length rejected".into())
}

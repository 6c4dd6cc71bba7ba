//! [`RowCipher`]: seal and open every encrypted field of a row in one AEAD call.

use common::{EncryptedRowPayload, RowSealError};
use uuid::Uuid;

use super::fields::FieldSet;
use super::framing;
use crate::aead::{self, IV_LEN, TAG_LEN};
use crate::hex;
use crate::kdf::KeyDerivationService;

/// Encrypts and decrypts whole rows.
///
/// Holds no state besides the shared [`KeyDerivationService`]; every call
/// derives its own row key and drops it before returning.
#[derive(Clone, Debug)]
pub struct RowCipher {
    kds: KeyDerivationService,
}

impl RowCipher {
    pub fn new(kds: KeyDerivationService) -> Self {
        Self { kds }
    }

    /// Seal `fields` for `row_id` under a fresh IV.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::MalformedPayload`] if a field is too large to
    /// frame.
    pub fn encrypt_row(
        &self,
        fields: &FieldSet,
        row_id: Uuid,
    ) -> Result<EncryptedRowPayload, RowSealError> {
        self.encrypt_row_with_context(fields, row_id, None)
    }

    /// [`RowCipher::encrypt_row`] with associated data bound into the tag.
    ///
    /// The same `associated_data` must be supplied to
    /// [`RowCipher::decrypt_row_with_context`].
    pub fn encrypt_row_with_context(
        &self,
        fields: &FieldSet,
        row_id: Uuid,
        associated_data: Option<&[u8]>,
    ) -> Result<EncryptedRowPayload, RowSealError> {
        let packed = framing::pack(fields)?;
        let key = self.kds.derive_row_key(row_id)?;
        let iv = aead::generate_iv();
        let sealed = aead::seal(key.as_bytes(), &iv, &packed, associated_data)?;

        Ok(EncryptedRowPayload {
            ciphertext: hex::encode(&sealed.ciphertext),
            iv: hex::encode(&iv),
            tag: hex::encode(&sealed.tag),
        })
    }

    /// Verify and open a stored payload for `row_id`.
    ///
    /// Fails closed: no field is returned unless the tag verifies.
    ///
    /// # Errors
    ///
    /// - [`RowSealError::Encoding`] for malformed hex or wrong IV/tag length.
    /// - [`RowSealError::Authentication`] for a wrong row id or any modified byte.
    /// - [`RowSealError::MalformedPayload`] if the verified plaintext is not
    ///   validly framed.
    pub fn decrypt_row(
        &self,
        payload: &EncryptedRowPayload,
        row_id: Uuid,
    ) -> Result<FieldSet, RowSealError> {
        self.decrypt_row_with_context(payload, row_id, None)
    }

    /// [`RowCipher::decrypt_row`] for payloads sealed with associated data.
    pub fn decrypt_row_with_context(
        &self,
        payload: &EncryptedRowPayload,
        row_id: Uuid,
        associated_data: Option<&[u8]>,
    ) -> Result<FieldSet, RowSealError> {
        let ciphertext = hex::decode(&payload.ciphertext)?;
        let iv: [u8; IV_LEN] = hex::decode_array(&payload.iv)?;
        let tag: [u8; TAG_LEN] = hex::decode_array(&payload.tag)?;

        let key = self.kds.derive_row_key(row_id)?;
        let packed = aead::open(key.as_bytes(), &iv, &ciphertext, &tag, associated_data)?;
        drop(key);

        framing::unpack(&packed)
    }
}

//! Row-level authenticated encryption for text columns.
//!
//! This crate is intentionally free of I/O, logging and database
//! dependencies. The persistence layer hands it a [`FieldSet`] and a row UUID
//! and stores the returned hex [`EncryptedRowPayload`] columns.
//!
//! ```text
//! FieldSet ──pack──► buffer ──seal(HKDF(master, row_id), fresh IV)──► (ciphertext, iv, tag) ──hex──► columns
//! ```

pub mod aead;
pub mod hex;
pub mod kdf;
pub mod row;

pub use common::{EncryptedRowPayload, RowSealError};
pub use kdf::{KeyDerivationService, MasterKey, RowKey, MIN_MASTER_KEY_LEN};
pub use row::{Field, FieldSet, RowCipher};

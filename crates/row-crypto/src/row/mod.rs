//! Multi-field row encryption.
//!
//! A row's encryptable fields are framed into one buffer and sealed with a
//! single IV and tag, so the whole row shares one authentication boundary.
//!
//! # Module invariants
//!
//! - No logging. Neither plaintext nor key material leaves this module except
//!   as the return value of a successful open.
//! - Row keys and packed plaintext are zeroed before each call returns.

pub mod cipher;
pub mod fields;
pub mod framing;

pub use cipher::RowCipher;
pub use fields::{Field, FieldSet};

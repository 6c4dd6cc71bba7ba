//! Common types, protocol definitions, and errors shared across `rowseal` crates.

pub mod error;
pub mod protocol;

pub use error::RowSealError;
pub use protocol::EncryptedRowPayload;

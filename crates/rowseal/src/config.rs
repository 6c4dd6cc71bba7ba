//! Configuration loading and validation for the rowseal service.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if the master secret is missing, cannot be
//! decoded, or is too short. The secret itself never appears in any message.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::RowSealError;
use row_crypto::MasterKey;
use serde::Deserialize;
use zeroize::{Zeroize, Zeroizing};

/// How `MASTER_KEY` is encoded in the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    #[default]
    Hex,
    Base64,
}

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Encoded master secret. **Required.**
    pub master_key: String,

    /// Encoding of [`Config::master_key`].
    #[serde(default)]
    pub master_key_encoding: KeyEncoding,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Longest accepted request line in bytes, newline excluded.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_max_request_bytes() -> usize {
    16 * 1024 * 1024
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `MASTER_KEY` is absent, undecodable or too short.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration (is MASTER_KEY set?)")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode the configured secret into a [`MasterKey`].
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::Configuration`] on bad encoding or short key.
    pub fn master_key(&self) -> Result<MasterKey, RowSealError> {
        let encoded = self.master_key.trim();
        if encoded.is_empty() {
            return Err(RowSealError::Configuration(
                "MASTER_KEY is required and must not be empty".into(),
            ));
        }
        // Decoder errors can quote secret characters; replace them wholesale.
        let bytes = Zeroizing::new(match self.master_key_encoding {
            KeyEncoding::Hex => hex_decode(encoded)?,
            KeyEncoding::Base64 => STANDARD.decode(encoded).map_err(|_| {
                RowSealError::Configuration("MASTER_KEY is not valid base64".into())
            })?,
        });
        MasterKey::from_bytes(&bytes)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        if self.max_request_bytes == 0 {
            anyhow::bail!("MAX_REQUEST_BYTES must be greater than zero");
        }
        self.master_key()?;
        Ok(())
    }
}

fn hex_decode(encoded: &str) -> Result<Vec<u8>, RowSealError> {
    row_crypto::hex::decode(encoded)
        .map_err(|_| RowSealError::Configuration("MASTER_KEY is not valid hex".into()))
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("master_key", &"[REDACTED]")
            .field("master_key_encoding", &self.master_key_encoding)
            .field("log_level", &self.log_level)
            .field("max_request_bytes", &self.max_request_bytes)
            .finish()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        self.master_key.zeroize();
    }
}

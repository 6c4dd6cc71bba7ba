//! `rowseal` — row encryption service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables. A missing or
//!    short master secret stops the process here.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Build the shared [`RowCipher`] around the master key.
//! 4. Serve line-delimited JSON requests from stdin until EOF.

mod config;
mod handlers;
mod session;
mod telemetry;

use anyhow::Result;
use row_crypto::{KeyDerivationService, RowCipher};
use tracing::info;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        encoding = ?cfg.master_key_encoding,
        "rowseal starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher
    // -----------------------------------------------------------------------
    let cipher = RowCipher::new(KeyDerivationService::new(cfg.master_key()?));
    let max_request_bytes = cfg.max_request_bytes;
    drop(cfg);

    // -----------------------------------------------------------------------
    // 4. Serve
    // -----------------------------------------------------------------------
    session::run(tokio::io::stdin(), tokio::io::stdout(), &cipher, max_request_bytes).await
}

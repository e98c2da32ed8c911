//! Per-call signature material.

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};

/// Bytes of OS randomness behind each nonce (hex-encoded to 32 chars).
pub const NONCE_BYTES: usize = 16;

/// A signature together with the timestamp and nonce it covers.
///
/// Produced fresh for every signing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    /// Base64 RSA-SHA256 signature.
    pub signature: String,
    /// Unix time in seconds.
    pub timestamp: i64,
    /// Lowercase hex nonce.
    pub nonce: String,
}

/// Generates a nonce from the operating system CSPRNG.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Current Unix time in whole seconds.
#[must_use]
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

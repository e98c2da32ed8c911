//! Error types for the signing core.
//!
//! Every fallible operation returns `Result<T, Report<WechatPayError>>`.
//! Messages name what failed, never the material involved: canonical strings,
//! key bytes and decrypted plaintext stay out of reports.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum WechatPayError {
    /// A required identity field is missing or malformed.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The RSA signing operation failed.
    #[display("Signing error: {message}")]
    Signing { message: String },

    /// AEAD tag mismatch or malformed encrypted envelope.
    #[display("Decryption error: {message}")]
    Decryption { message: String },

    /// A gateway response body did not have the expected shape.
    #[display("Invalid gateway response: {message}")]
    InvalidResponse { message: String },

    /// An authorization header could not be parsed.
    #[display("Invalid authorization header: {message}")]
    InvalidHeader { message: String },
}

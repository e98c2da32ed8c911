//! Signing core for the merchant API v3 payment protocol.
//!
//! This crate holds the cryptographic work a merchant backend does around the
//! gateway's HTTP API. Sending requests and mapping endpoint JSON is left to
//! the caller, which hands this crate the exact bytes it sends or receives.
//!
//! # Modules
//!
//! - [`canonical`]: Canonical message builders for the three signed forms
//! - [`certificates`]: Decrypting the platform certificate list for rotation
//! - [`decryption`]: AES-256-GCM envelope decryption with the API v3 key
//! - [`envelope`]: Fresh timestamps and nonces for each signature
//! - [`error`]: Error types and error handling utilities
//! - [`identity`]: Merchant signing identity and platform certificate
//! - [`pay_sign`]: Signed parameters for the client-side payment widget
//! - [`settings`]: Configuration loading from TOML and environment
//! - [`signing`]: Request signing and the `Authorization` header
//! - [`verifier`]: Callback signature verification
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wechatpay_signing::identity::SigningIdentity;
//! use wechatpay_signing::settings::Settings;
//! use wechatpay_signing::signing::RequestSigner;
//!
//! # fn main() -> Result<(), error_stack::Report<wechatpay_signing::error::WechatPayError>> {
//! let settings = Settings::from_file("wechatpay.toml".as_ref())?;
//! let identity = Arc::new(SigningIdentity::from_settings(&settings)?);
//!
//! let signer = RequestSigner::new(Arc::clone(&identity));
//! let body = br#"{"appid":"wxd678efh567hg6787"}"#;
//! let header = signer.authorization_header("POST", "/v3/pay/transactions/jsapi", body)?;
//! // Attach `header.to_string()` as the `Authorization` header and send `body` unchanged.
//! # let _ = header;
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod certificates;
pub mod decryption;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod pay_sign;
pub mod settings;
pub mod signing;
pub mod verifier;

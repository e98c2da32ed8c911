//! Callback signature verification.
//!
//! Verification fails closed: every problem, from a missing platform
//! certificate to garbage in the signature header, yields `false`. The reason
//! is logged for operators but never returned, so callers cannot tell a
//! malformed signature apart from a cryptographic mismatch.

use std::sync::Arc;

use base64::{engine::general_purpose, Engine};
use derive_more::Display;
use http::header::{HeaderMap, HeaderName};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;

use crate::canonical;
use crate::identity::SigningIdentity;

pub const HEADER_WECHATPAY_TIMESTAMP: HeaderName = HeaderName::from_static("wechatpay-timestamp");
pub const HEADER_WECHATPAY_NONCE: HeaderName = HeaderName::from_static("wechatpay-nonce");
pub const HEADER_WECHATPAY_SIGNATURE: HeaderName = HeaderName::from_static("wechatpay-signature");
pub const HEADER_WECHATPAY_SERIAL: HeaderName = HeaderName::from_static("wechatpay-serial");

#[derive(Debug, Display)]
enum VerificationFailure {
    #[display("no platform certificate loaded")]
    MissingCertificate,
    #[display("signature is not valid base64")]
    MalformedBase64,
    #[display("signature has the wrong length for the platform key")]
    MalformedSignature,
    #[display("certificate serial {_0} does not match the loaded certificate")]
    SerialMismatch(String),
    #[display("signature does not match")]
    Mismatch,
}

pub struct CallbackVerifier {
    identity: Arc<SigningIdentity>,
    key: Option<VerifyingKey<Sha256>>,
}

impl CallbackVerifier {
    #[must_use]
    pub fn new(identity: Arc<SigningIdentity>) -> Self {
        let key = identity
            .platform_certificate()
            .map(|certificate| VerifyingKey::<Sha256>::new(certificate.public_key().clone()));
        Self { identity, key }
    }

    /// Returns `true` only if `signature_b64` is the platform's signature over
    /// `TIMESTAMP\nNONCE\nBODY\n`.
    ///
    /// All inputs must be the untouched values from the callback request.
    #[must_use]
    pub fn is_authentic_notification(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &[u8],
        signature_b64: &str,
    ) -> bool {
        match self.check(timestamp, nonce, body, signature_b64) {
            Ok(()) => true,
            Err(failure) => {
                log::warn!("Rejected callback signature (timestamp {timestamp}): {failure}");
                false
            }
        }
    }

    /// Verifies a callback from its HTTP headers.
    ///
    /// Returns `false` when any of the timestamp, nonce or signature headers is
    /// missing, or when the serial header names a certificate other than the
    /// loaded one.
    #[must_use]
    pub fn verify_headers(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(notification) = NotificationHeaders::from_headers(headers) else {
            log::warn!("Rejected callback: missing signature headers");
            return false;
        };

        if let Some(serial) = &notification.serial {
            let expected = self.identity.platform_certificate().map(|c| c.serial_no());
            if expected.is_some_and(|expected| !expected.eq_ignore_ascii_case(serial)) {
                log::warn!(
                    "Rejected callback signature: {}",
                    VerificationFailure::SerialMismatch(serial.clone())
                );
                return false;
            }
        }

        self.is_authentic_notification(
            &notification.timestamp,
            &notification.nonce,
            body,
            &notification.signature,
        )
    }

    fn check(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &[u8],
        signature_b64: &str,
    ) -> Result<(), VerificationFailure> {
        let key = self
            .key
            .as_ref()
            .ok_or(VerificationFailure::MissingCertificate)?;

        let bytes = general_purpose::STANDARD
            .decode(signature_b64)
            .map_err(|_| VerificationFailure::MalformedBase64)?;
        let signature = Signature::try_from(bytes.as_slice())
            .map_err(|_| VerificationFailure::MalformedSignature)?;

        let message = canonical::callback_message(timestamp, nonce, body);
        key.verify(&message, &signature)
            .map_err(|_| VerificationFailure::Mismatch)
    }
}

/// Signature headers of an inbound callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: Option<String>,
}

impl NotificationHeaders {
    /// Extracts the callback signature headers, or `None` if a required one is
    /// missing or not visible ASCII.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Some(Self {
            timestamp: get(&HEADER_WECHATPAY_TIMESTAMP)?,
            nonce: get(&HEADER_WECHATPAY_NONCE)?,
            signature: get(&HEADER_WECHATPAY_SIGNATURE)?,
            serial: get(&HEADER_WECHATPAY_SERIAL),
        })
    }
}

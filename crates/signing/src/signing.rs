//! Outbound request signing.
//!
//! [`RequestSigner`] signs canonical request messages with the merchant RSA
//! key (RSASSA-PKCS1-v1_5 over SHA-256) and formats the `Authorization`
//! header the gateway expects.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rand::rngs::OsRng;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use sha2::Sha256;

use crate::canonical;
use crate::envelope::{current_timestamp, generate_nonce, SignatureEnvelope};
use crate::error::WechatPayError;
use crate::identity::SigningIdentity;

/// Scheme token that prefixes every authorization header.
pub const AUTHORIZATION_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";

pub struct RequestSigner {
    identity: Arc<SigningIdentity>,
    key: SigningKey<Sha256>,
}

impl RequestSigner {
    #[must_use]
    pub fn new(identity: Arc<SigningIdentity>) -> Self {
        let key = SigningKey::<Sha256>::new(identity.private_key().clone());
        Self { identity, key }
    }

    #[must_use]
    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Signs raw bytes and returns the standard base64 signature.
    ///
    /// The private-key operation is blinded with fresh randomness; the
    /// PKCS#1 v1.5 signature itself stays deterministic.
    ///
    /// # Errors
    ///
    /// Returns a signing error if the RSA operation fails.
    pub fn sign(&self, message: &[u8]) -> Result<String, Report<WechatPayError>> {
        let signature = self
            .key
            .try_sign_with_rng(&mut OsRng, message)
            .map_err(|e| {
                Report::new(WechatPayError::Signing {
                    message: format!("RSA-SHA256 signing failed: {e}"),
                })
            })?;

        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    /// Draws a fresh timestamp and nonce, builds the message from them with
    /// `build`, and signs it.
    ///
    /// # Errors
    ///
    /// Returns a signing error if the RSA operation fails.
    pub fn sign_fresh<F>(&self, build: F) -> Result<SignatureEnvelope, Report<WechatPayError>>
    where
        F: FnOnce(i64, &str) -> Vec<u8>,
    {
        let timestamp = current_timestamp();
        let nonce = generate_nonce();
        let signature = self.sign(&build(timestamp, &nonce))?;

        Ok(SignatureEnvelope {
            signature,
            timestamp,
            nonce,
        })
    }

    /// Signs an outbound API call and returns its authorization header.
    ///
    /// `url_path` is the path plus query string exactly as requested, and
    /// `body` the exact bytes that will be sent (empty for `GET`).
    ///
    /// # Errors
    ///
    /// Returns a signing error if the RSA operation fails.
    pub fn authorization_header(
        &self,
        method: &str,
        url_path: &str,
        body: &[u8],
    ) -> Result<AuthorizationHeader, Report<WechatPayError>> {
        let envelope = self.sign_fresh(|timestamp, nonce| {
            canonical::request_message(method, url_path, timestamp, nonce, body)
        })?;

        log::debug!(
            "Signed {} {} with certificate {}",
            method,
            url_path,
            self.identity.private_key_serial()
        );

        Ok(AuthorizationHeader {
            mch_id: self.identity.mch_id().to_string(),
            nonce_str: envelope.nonce,
            serial_no: self.identity.private_key_serial().to_string(),
            signature: envelope.signature,
            timestamp: envelope.timestamp,
        })
    }
}

/// Value of the `Authorization` header for one request.
///
/// Renders via [`fmt::Display`] as
/// `WECHATPAY2-SHA256-RSA2048 mchid="..",nonce_str="..",serial_no="..",signature="..",timestamp=".."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    pub mch_id: String,
    pub nonce_str: String,
    pub serial_no: String,
    pub signature: String,
    pub timestamp: i64,
}

impl AuthorizationHeader {
    /// Parses a header value produced by [`fmt::Display`].
    ///
    /// # Errors
    ///
    /// Returns an invalid-header error if the scheme is wrong, a parameter is
    /// missing, unquoted, out of order, or the timestamp is not an integer.
    pub fn parse(value: &str) -> Result<Self, Report<WechatPayError>> {
        let invalid = |message: String| Report::new(WechatPayError::InvalidHeader { message });

        let params = value
            .strip_prefix(AUTHORIZATION_SCHEME)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| invalid(format!("expected scheme {AUTHORIZATION_SCHEME}")))?;

        let mut values = Vec::with_capacity(5);
        for (param, expected) in params.split(',').zip(HEADER_PARAMS) {
            let (name, quoted) = param
                .split_once('=')
                .ok_or_else(|| invalid(format!("parameter '{param}' has no value")))?;
            if name != expected {
                return Err(invalid(format!("expected parameter '{expected}', found '{name}'")));
            }
            let unquoted = quoted
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .ok_or_else(|| invalid(format!("parameter '{name}' is not quoted")))?;
            values.push(unquoted.to_string());
        }

        let [mch_id, nonce_str, serial_no, signature, timestamp]: [String; 5] =
            values.try_into().map_err(|values: Vec<String>| {
                invalid(format!("expected 5 parameters, found {}", values.len()))
            })?;

        if params.split(',').count() != HEADER_PARAMS.len() {
            return Err(invalid("unexpected trailing parameters".into()));
        }

        let timestamp = timestamp
            .parse()
            .map_err(|_| invalid(format!("timestamp '{timestamp}' is not an integer")))?;

        Ok(Self {
            mch_id,
            nonce_str,
            serial_no,
            signature,
            timestamp,
        })
    }
}

const HEADER_PARAMS: [&str; 5] = ["mchid", "nonce_str", "serial_no", "signature", "timestamp"];

impl fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{AUTHORIZATION_SCHEME} mchid=\"{}\",nonce_str=\"{}\",serial_no=\"{}\",signature=\"{}\",timestamp=\"{}\"",
            self.mch_id, self.nonce_str, self.serial_no, self.signature, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::pkcs8::DecodePublicKey;
    use rsa::signature::Verifier;
    use rsa::RsaPublicKey;

    use super::*;
    use crate::test_support::tests::{
        test_identity, MERCHANT_PUBLIC_KEY_PEM, TEST_KEY_SERIAL, TEST_MCH_ID,
    };

    fn verify_with_merchant_key(message: &[u8], signature_b64: &str) -> bool {
        let public_key = RsaPublicKey::from_public_key_pem(MERCHANT_PUBLIC_KEY_PEM)
            .expect("fixture public key should parse");
        let bytes = general_purpose::STANDARD
            .decode(signature_b64)
            .expect("signature should be base64");
        let signature =
            Signature::try_from(bytes.as_slice()).expect("signature should be 256 bytes");
        VerifyingKey::<Sha256>::new(public_key)
            .verify(message, &signature)
            .is_ok()
    }

    #[test]
    fn test_sign_matches_openssl() {
        // `printf '...' | openssl dgst -sha256 -sign merchant_key.pem | base64 -w0`
        let expected = "wg/uXIf4Obaw3joHLNuOQLPC8AFAKuPQ55FE1ZLrs9FOcuAOy3zOXCh39ODp5eksmASkIjRAW/haHMOOfsSvdFExdAZ9Et38ikYvAELC0zCYWRgJURdcQe+0PX2OmmhNlqtNaKYtQ5GBACT1mT6XixXBemQTWp1iit/H63BKvaSOeOpad1E5A4ZT97z1vOQKS/onqFcAV3fQdKwJIJm4usAgHF+DWBLP2FVepoOfpmR9feeNgv6NNdYaDu7mcOmZ1qIko9nsxbz4VMArblZyFeBh/rFKnNzSfAIhY2as4ROz9j/LpE7z4bHddkEip93Bh0x0QH/MO6svWHNPWRstHg==";
        let message = canonical::request_message(
            "POST",
            "/v3/pay/transactions/jsapi",
            1_700_000_000,
            "593BEC0C930BF1AFEB40B4A08C8FB242",
            br#"{"a":1}"#,
        );

        let signer = RequestSigner::new(test_identity());
        assert_eq!(signer.sign(&message).expect("should sign"), expected);
    }

    #[test]
    fn test_blinded_signing_is_deterministic() {
        let signer = RequestSigner::new(test_identity());
        let message = canonical::callback_message("1700000000", "n", b"{}");

        let first = signer.sign(&message).expect("should sign");
        let second = signer.sign(&message).expect("should sign");
        assert_eq!(first, second);
        assert!(verify_with_merchant_key(&message, &first));
    }

    #[test]
    fn test_authorization_header_format() {
        let signer = RequestSigner::new(test_identity());
        let header = signer
            .authorization_header("GET", "/v3/certificates", b"")
            .expect("should sign");
        let value = header.to_string();

        let params = value
            .strip_prefix("WECHATPAY2-SHA256-RSA2048 ")
            .expect("should start with scheme");
        let names: Vec<&str> = params
            .split(',')
            .map(|p| p.split_once('=').expect("param should have value").0)
            .collect();
        assert_eq!(
            names,
            ["mchid", "nonce_str", "serial_no", "signature", "timestamp"]
        );

        for param in params.split(',') {
            let (_, quoted) = param.split_once('=').expect("param should have value");
            assert!(
                quoted.starts_with('"') && quoted.ends_with('"'),
                "{param} should be quoted"
            );
        }
        assert!(!params.contains(", "));
        assert!(params.contains(&format!("mchid=\"{TEST_MCH_ID}\"")));
        assert!(params.contains(&format!("serial_no=\"{TEST_KEY_SERIAL}\"")));
    }

    #[test]
    fn test_authorization_header_round_trip_verifies() {
        let body = br#"{"a":1}"#;
        let signer = RequestSigner::new(test_identity());
        let header = signer
            .authorization_header("POST", "/v3/pay/transactions/jsapi", body)
            .expect("should sign");

        let parsed = AuthorizationHeader::parse(&header.to_string()).expect("should parse");
        assert_eq!(parsed, header);

        let message = canonical::request_message(
            "POST",
            "/v3/pay/transactions/jsapi",
            parsed.timestamp,
            &parsed.nonce_str,
            body,
        );
        assert!(verify_with_merchant_key(&message, &parsed.signature));

        let tampered = canonical::request_message(
            "POST",
            "/v3/pay/transactions/jsapi",
            parsed.timestamp,
            &parsed.nonce_str,
            br#"{"a":2}"#,
        );
        assert!(!verify_with_merchant_key(&tampered, &parsed.signature));
    }

    #[test]
    fn test_authorization_header_is_fresh_per_call() {
        let signer = RequestSigner::new(test_identity());
        let first = signer
            .authorization_header("POST", "/v3/pay/transactions/jsapi", br#"{"a":1}"#)
            .expect("should sign");
        let second = signer
            .authorization_header("POST", "/v3/pay/transactions/jsapi", br#"{"a":1}"#)
            .expect("should sign");

        assert_ne!(first.nonce_str, second.nonce_str);
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn test_signer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RequestSigner>();
    }

    #[test]
    fn test_concurrent_signing() {
        let signer = Arc::new(RequestSigner::new(test_identity()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let signer = Arc::clone(&signer);
                std::thread::spawn(move || {
                    let path = format!("/v3/refund/domestic/refunds/{i}");
                    signer
                        .authorization_header("GET", &path, b"")
                        .expect("should sign")
                })
            })
            .collect();

        let nonces: std::collections::HashSet<String> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic").nonce_str)
            .collect();
        assert_eq!(nonces.len(), 4);
    }

    #[test]
    fn test_parse_rejects_wrong_scheme() {
        let err = AuthorizationHeader::parse("Bearer token").expect_err("should reject scheme");
        assert!(matches!(err.current_context(), WechatPayError::InvalidHeader { .. }));
    }

    #[test]
    fn test_parse_rejects_reordered_params() {
        let value = r#"WECHATPAY2-SHA256-RSA2048 nonce_str="n",mchid="1",serial_no="s",signature="sig",timestamp="1""#;
        assert!(AuthorizationHeader::parse(value).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_and_extra_params() {
        let missing = r#"WECHATPAY2-SHA256-RSA2048 mchid="1",nonce_str="n",serial_no="s",signature="sig""#;
        assert!(AuthorizationHeader::parse(missing).is_err());

        let extra = r#"WECHATPAY2-SHA256-RSA2048 mchid="1",nonce_str="n",serial_no="s",signature="sig",timestamp="1",x="y""#;
        assert!(AuthorizationHeader::parse(extra).is_err());
    }

    #[test]
    fn test_parse_rejects_unquoted_and_bad_timestamp() {
        let unquoted = r#"WECHATPAY2-SHA256-RSA2048 mchid=1,nonce_str="n",serial_no="s",signature="sig",timestamp="1""#;
        assert!(AuthorizationHeader::parse(unquoted).is_err());

        let bad_ts = r#"WECHATPAY2-SHA256-RSA2048 mchid="1",nonce_str="n",serial_no="s",signature="sig",timestamp="soon""#;
        assert!(AuthorizationHeader::parse(bad_ts).is_err());
    }
}

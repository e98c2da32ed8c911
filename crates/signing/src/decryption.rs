//! AES-256-GCM envelope decryption.
//!
//! The gateway encrypts sensitive fields (rotated platform certificates,
//! callback resources) with the merchant's API v3 key. Each envelope carries
//! associated data, a 12-byte nonce, and base64 of `ciphertext || tag`, where
//! the tag is always the trailing 16 bytes.

use std::sync::Arc;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::WechatPayError;
use crate::identity::SigningIdentity;

/// Algorithm name the gateway uses for these envelopes.
pub const AEAD_AES_256_GCM: &str = "AEAD_AES_256_GCM";

/// GCM authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

/// GCM nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// An encrypted envelope as it appears in gateway JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncryptedResource {
    pub algorithm: String,
    pub nonce: String,
    #[serde(default)]
    pub associated_data: String,
    pub ciphertext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
}

pub struct CertificateDecryptor {
    identity: Arc<SigningIdentity>,
}

impl CertificateDecryptor {
    #[must_use]
    pub fn new(identity: Arc<SigningIdentity>) -> Self {
        Self { identity }
    }

    /// Decrypts one envelope and returns the plaintext.
    ///
    /// `nonce` is the raw nonce bytes as delivered (not base64). The GCM tag
    /// is checked before any plaintext is returned.
    ///
    /// # Errors
    ///
    /// Returns a decryption error if the ciphertext is not base64, is shorter
    /// than the tag, the nonce is not 12 bytes, or authentication fails.
    pub fn decrypt(
        &self,
        associated_data: &[u8],
        nonce: &[u8],
        ciphertext_b64: &str,
    ) -> Result<Vec<u8>, Report<WechatPayError>> {
        let decryption_error =
            |message: String| Report::new(WechatPayError::Decryption { message });

        if nonce.len() != NONCE_LENGTH {
            return Err(decryption_error(format!(
                "nonce must be {NONCE_LENGTH} bytes, got {}",
                nonce.len()
            )));
        }

        let mut blob = general_purpose::STANDARD
            .decode(ciphertext_b64)
            .map_err(|e| decryption_error(format!("ciphertext is not valid base64: {e}")))?;

        if blob.len() < TAG_LENGTH {
            return Err(decryption_error(format!(
                "ciphertext is {} bytes, shorter than the {TAG_LENGTH}-byte tag",
                blob.len()
            )));
        }

        let split = blob.len() - TAG_LENGTH;
        let tag = Tag::clone_from_slice(&blob[split..]);
        blob.truncate(split);

        let key = Key::<Aes256Gcm>::from_slice(self.identity.api_v3_key().as_bytes());
        let cipher = Aes256Gcm::new(key);
        if cipher
            .decrypt_in_place_detached(Nonce::from_slice(nonce), associated_data, &mut blob, &tag)
            .is_err()
        {
            blob.zeroize();
            return Err(decryption_error("authentication tag mismatch".into()));
        }

        Ok(blob)
    }

    /// Decrypts an envelope taken from gateway JSON.
    ///
    /// # Errors
    ///
    /// Returns a decryption error for algorithms other than
    /// [`AEAD_AES_256_GCM`], or any error from [`CertificateDecryptor::decrypt`].
    pub fn decrypt_resource(
        &self,
        resource: &EncryptedResource,
    ) -> Result<Vec<u8>, Report<WechatPayError>> {
        if resource.algorithm != AEAD_AES_256_GCM {
            return Err(Report::new(WechatPayError::Decryption {
                message: format!("unsupported algorithm '{}'", resource.algorithm),
            }));
        }

        self.decrypt(
            resource.associated_data.as_bytes(),
            resource.nonce.as_bytes(),
            &resource.ciphertext,
        )
    }
}

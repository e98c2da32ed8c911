//! Merchant signing identity.
//!
//! A [`SigningIdentity`] bundles everything the signing core needs: the
//! merchant and app identifiers, the API v3 symmetric key, the merchant RSA
//! private key with its certificate serial, and (once downloaded) the
//! gateway's platform certificate. It is built once at startup and shared
//! read-only behind an `Arc`.

use std::fmt;

use error_stack::Report;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::WechatPayError;
use crate::settings::Settings;

/// Length in bytes of the API v3 key (AES-256).
pub const API_V3_KEY_LENGTH: usize = 32;

/// Smallest RSA modulus accepted for the `RSA2048` scheme.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// The merchant's API v3 key, used only as the AES-256-GCM key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiV3Key([u8; API_V3_KEY_LENGTH]);

impl ApiV3Key {
    /// Builds a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `bytes` is exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Report<WechatPayError>> {
        let key: [u8; API_V3_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            Report::new(WechatPayError::Configuration {
                message: format!(
                    "Invalid API v3 key length (expected {API_V3_KEY_LENGTH} bytes, got {})",
                    bytes.len()
                ),
            })
        })?;
        Ok(Self(key))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; API_V3_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for ApiV3Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiV3Key(..)")
    }
}

/// The gateway's public key, used only to verify callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCertificate {
    serial_no: String,
    public_key: RsaPublicKey,
}

impl PlatformCertificate {
    #[must_use]
    pub fn new(serial_no: impl Into<String>, public_key: RsaPublicKey) -> Self {
        Self {
            serial_no: serial_no.into(),
            public_key,
        }
    }

    /// Parses a PEM-encoded X.509 certificate. The serial number is taken from
    /// the certificate and rendered as uppercase hex, the way the gateway
    /// reports it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the PEM is not an X.509 certificate
    /// or does not carry an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, Report<WechatPayError>> {
        let certificate = Certificate::from_pem(pem.as_bytes()).map_err(|e| {
            Report::new(WechatPayError::Configuration {
                message: format!("Failed to parse platform certificate: {e}"),
            })
        })?;

        let spki_der = certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| {
                Report::new(WechatPayError::Configuration {
                    message: format!("Failed to encode certificate public key: {e}"),
                })
            })?;

        let public_key = RsaPublicKey::from_public_key_der(&spki_der).map_err(|e| {
            Report::new(WechatPayError::Configuration {
                message: format!("Platform certificate does not hold an RSA key: {e}"),
            })
        })?;

        let serial_no = serial_to_hex(certificate.tbs_certificate.serial_number.as_bytes());

        Ok(Self::new(serial_no, public_key))
    }

    /// Parses a bare `PUBLIC KEY` PEM, for gateways that publish a platform
    /// public key with its own identifier instead of a certificate.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the PEM is not an RSA public key.
    pub fn from_public_key_pem(
        serial_no: impl Into<String>,
        pem: &str,
    ) -> Result<Self, Report<WechatPayError>> {
        let public_key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| {
            Report::new(WechatPayError::Configuration {
                message: format!("Failed to parse platform public key: {e}"),
            })
        })?;

        Ok(Self::new(serial_no, public_key))
    }

    #[must_use]
    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

fn serial_to_hex(bytes: &[u8]) -> String {
    // DER integers carry a leading zero byte when the high bit is set.
    let significant = match bytes.iter().position(|&b| b != 0) {
        Some(start) => &bytes[start..],
        None => &bytes[bytes.len().saturating_sub(1)..],
    };
    hex::encode_upper(significant)
}

/// Parses the merchant private key from PKCS#8 (`PRIVATE KEY`) or PKCS#1
/// (`RSA PRIVATE KEY`) PEM.
///
/// # Errors
///
/// Returns a configuration error if neither encoding parses or the modulus is
/// shorter than [`MIN_RSA_KEY_BITS`].
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, Report<WechatPayError>> {
    let key = RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| {
            Report::new(WechatPayError::Configuration {
                message: format!("Failed to parse merchant private key: {e}"),
            })
        })?;

    let bits = key.size() * 8;
    if bits < MIN_RSA_KEY_BITS {
        return Err(Report::new(WechatPayError::Configuration {
            message: format!(
                "Merchant private key is {bits} bits, at least {MIN_RSA_KEY_BITS} required"
            ),
        }));
    }

    Ok(key)
}

pub struct SigningIdentity {
    app_id: String,
    mch_id: String,
    api_v3_key: ApiV3Key,
    private_key: RsaPrivateKey,
    private_key_serial: String,
    platform_certificate: Option<PlatformCertificate>,
}

impl SigningIdentity {
    /// Creates an identity without a platform certificate. Callback
    /// verification fails closed until one is attached with
    /// [`SigningIdentity::with_platform_certificate`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any identifier is empty.
    pub fn new(
        app_id: impl Into<String>,
        mch_id: impl Into<String>,
        api_v3_key: ApiV3Key,
        private_key: RsaPrivateKey,
        private_key_serial: impl Into<String>,
    ) -> Result<Self, Report<WechatPayError>> {
        let app_id = app_id.into();
        let mch_id = mch_id.into();
        let private_key_serial = private_key_serial.into();

        for (field, value) in [
            ("app_id", &app_id),
            ("mch_id", &mch_id),
            ("private_key_serial", &private_key_serial),
        ] {
            if value.is_empty() {
                return Err(Report::new(WechatPayError::Configuration {
                    message: format!("Signing identity field '{field}' is empty"),
                }));
            }
        }

        Ok(Self {
            app_id,
            mch_id,
            api_v3_key,
            private_key,
            private_key_serial,
            platform_certificate: None,
        })
    }

    #[must_use]
    pub fn with_platform_certificate(mut self, certificate: PlatformCertificate) -> Self {
        self.platform_certificate = Some(certificate);
        self
    }

    /// Builds an identity from loaded settings, parsing all PEM material.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any field is missing or any key or
    /// certificate fails to parse.
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<WechatPayError>> {
        let merchant = &settings.merchant;
        let private_key = parse_private_key(&merchant.private_key_pem)?;
        let api_v3_key = ApiV3Key::from_bytes(merchant.api_v3_key.as_bytes())?;

        let identity = Self::new(
            merchant.app_id.clone(),
            merchant.mch_id.clone(),
            api_v3_key,
            private_key,
            merchant.private_key_serial.clone(),
        )?;

        let platform = &settings.platform;
        let certificate = match (
            &platform.certificate_pem,
            &platform.public_key_pem,
            &platform.public_key_serial,
        ) {
            (Some(pem), _, _) => Some(PlatformCertificate::from_pem(pem)?),
            (None, Some(pem), Some(serial)) => {
                Some(PlatformCertificate::from_public_key_pem(serial.clone(), pem)?)
            }
            (None, Some(_), None) => {
                return Err(Report::new(WechatPayError::Configuration {
                    message: "platform.public_key_pem requires platform.public_key_serial".into(),
                }));
            }
            (None, None, _) => None,
        };

        match certificate {
            Some(certificate) => {
                log::info!(
                    "Loaded platform certificate {} for merchant {}",
                    certificate.serial_no(),
                    identity.mch_id
                );
                Ok(identity.with_platform_certificate(certificate))
            }
            None => {
                log::warn!(
                    "No platform certificate for merchant {}; callbacks will be rejected",
                    identity.mch_id
                );
                Ok(identity)
            }
        }
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn mch_id(&self) -> &str {
        &self.mch_id
    }

    #[must_use]
    pub fn api_v3_key(&self) -> &ApiV3Key {
        &self.api_v3_key
    }

    #[must_use]
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    #[must_use]
    pub fn private_key_serial(&self) -> &str {
        &self.private_key_serial
    }

    #[must_use]
    pub fn platform_certificate(&self) -> Option<&PlatformCertificate> {
        self.platform_certificate.as_ref()
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("private_key_serial", &self.private_key_serial)
            .field(
                "platform_certificate",
                &self
                    .platform_certificate
                    .as_ref()
                    .map(PlatformCertificate::serial_no),
            )
            .finish_non_exhaustive()
    }
}

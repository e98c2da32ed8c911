//! Platform certificate rotation.
//!
//! The gateway's certificate list response carries every currently valid
//! platform certificate, each encrypted with the merchant's API v3 key. This
//! module unwraps those entries; fetching the list over HTTP is the caller's
//! job.

use chrono::{DateTime, FixedOffset, Utc};
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::decryption::{CertificateDecryptor, EncryptedResource};
use crate::error::WechatPayError;
use crate::identity::PlatformCertificate;

/// Path of the certificate list endpoint, signed as a `GET` with empty body.
pub const CERTIFICATES_PATH: &str = "/v3/certificates";

#[derive(Debug, Deserialize)]
struct CertificateListResponse {
    data: Option<Vec<EncryptedCertificateEntry>>,
}

/// One entry of the certificate list, still encrypted.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedCertificateEntry {
    pub serial_no: String,
    pub effective_time: DateTime<FixedOffset>,
    pub expire_time: DateTime<FixedOffset>,
    pub encrypt_certificate: EncryptedResource,
}

/// A decrypted platform certificate and its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCertificateRecord {
    pub effective_time: DateTime<FixedOffset>,
    pub expire_time: DateTime<FixedOffset>,
    pub serial_no: String,
    /// Plaintext certificate, PEM as delivered by the gateway.
    pub certificate: Vec<u8>,
}

impl std::fmt::Debug for PlatformCertificateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCertificateRecord")
            .field("effective_time", &self.effective_time)
            .field("expire_time", &self.expire_time)
            .field("serial_no", &self.serial_no)
            .field(
                "certificate",
                &format_args!("{} bytes", self.certificate.len()),
            )
            .finish()
    }
}

impl PlatformCertificateRecord {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_time <= now && now < self.expire_time
    }

    /// Picks the certificate valid at `now` with the latest effective time.
    #[must_use]
    pub fn select_current(records: &[Self], now: DateTime<Utc>) -> Option<&Self> {
        records
            .iter()
            .filter(|record| record.is_valid_at(now))
            .max_by_key(|record| record.effective_time)
    }

    /// Parses the plaintext certificate into a verification key.
    ///
    /// # Errors
    ///
    /// Returns an error if the plaintext is not a PEM X.509 certificate or its
    /// serial number differs from the one the gateway listed.
    pub fn to_platform_certificate(&self) -> Result<PlatformCertificate, Report<WechatPayError>> {
        let pem = std::str::from_utf8(&self.certificate).change_context(
            WechatPayError::InvalidResponse {
                message: format!("certificate {} is not UTF-8 PEM", self.serial_no),
            },
        )?;

        let certificate = PlatformCertificate::from_pem(pem)
            .attach(format!("while parsing certificate {}", self.serial_no))?;

        let listed = &self.serial_no;
        if !certificate.serial_no().eq_ignore_ascii_case(listed) {
            return Err(Report::new(WechatPayError::InvalidResponse {
                message: format!(
                    "certificate serial {} does not match listed serial {}",
                    certificate.serial_no(),
                    self.serial_no
                ),
            }));
        }

        Ok(certificate)
    }
}

/// Parses a certificate list response body without decrypting it.
///
/// # Errors
///
/// Returns an invalid-response error if the body is not JSON or has no `data`
/// array.
pub fn parse_certificate_list(
    body: &str,
) -> Result<Vec<EncryptedCertificateEntry>, Report<WechatPayError>> {
    let response: CertificateListResponse =
        serde_json::from_str(body).change_context(WechatPayError::InvalidResponse {
            message: "certificate list is not valid JSON".into(),
        })?;

    response.data.ok_or_else(|| {
        Report::new(WechatPayError::InvalidResponse {
            message: "certificate list has no data array".into(),
        })
    })
}

/// Decrypts every entry of a certificate list response.
///
/// Fails as a whole if any entry fails to decrypt, so a caller never adopts a
/// partial list; on error the previously loaded certificate stays in use.
///
/// # Errors
///
/// Returns an invalid-response error for a malformed body, or a decryption
/// error naming the serial of the entry that failed.
pub fn decrypt_certificate_list(
    decryptor: &CertificateDecryptor,
    body: &str,
) -> Result<Vec<PlatformCertificateRecord>, Report<WechatPayError>> {
    parse_certificate_list(body)?
        .into_iter()
        .map(|entry| {
            let certificate = decryptor
                .decrypt_resource(&entry.encrypt_certificate)
                .attach(format!("while decrypting certificate {}", entry.serial_no))?;

            log::info!(
                "Decrypted platform certificate {} (valid {} to {})",
                entry.serial_no,
                entry.effective_time,
                entry.expire_time
            );

            Ok(PlatformCertificateRecord {
                effective_time: entry.effective_time,
                expire_time: entry.expire_time,
                serial_no: entry.serial_no,
                certificate,
            })
        })
        .collect()
}

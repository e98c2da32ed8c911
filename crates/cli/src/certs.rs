//! Platform certificate list decryption command.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use wechatpay_signing::certificates::{decrypt_certificate_list, PlatformCertificateRecord};
use wechatpay_signing::decryption::CertificateDecryptor;
use wechatpay_signing::identity::SigningIdentity;

use crate::error::CliError;

/// What `decrypt-certs` reports for each certificate in the list.
#[derive(Debug, Serialize)]
pub struct CertificateSummary {
    pub serial_no: String,
    pub effective_time: String,
    pub expire_time: String,
    /// The certificate to load as `platform.certificate_pem` right now.
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Decrypts a saved certificate list response.
///
/// Every certificate is parsed and checked against its listed serial before
/// anything is written. With `output_dir`, each one is saved as
/// `<serial_no>.pem`.
pub fn decrypt_certificates(
    identity: Arc<SigningIdentity>,
    response_file: &Path,
    output_dir: Option<&Path>,
) -> Result<Vec<CertificateSummary>, CliError> {
    let body = fs::read_to_string(response_file)?;
    let decryptor = CertificateDecryptor::new(identity);
    let records = decrypt_certificate_list(&decryptor, &body)?;

    for record in &records {
        record.to_platform_certificate()?;
    }

    let current_serial = PlatformCertificateRecord::select_current(&records, Utc::now())
        .map(|record| record.serial_no.clone());
    if current_serial.is_none() {
        log::warn!("No certificate in the list is valid now");
    }

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)?;
    }

    records
        .into_iter()
        .map(|record| {
            let path = match output_dir {
                Some(dir) => {
                    let path = dir.join(format!("{}.pem", record.serial_no));
                    fs::write(&path, &record.certificate)?;
                    log::info!(
                        "Wrote certificate {} to {}",
                        record.serial_no,
                        path.display()
                    );
                    Some(path)
                }
                None => None,
            };

            Ok(CertificateSummary {
                current: current_serial.as_deref() == Some(record.serial_no.as_str()),
                effective_time: record.effective_time.to_rfc3339(),
                expire_time: record.expire_time.to_rfc3339(),
                serial_no: record.serial_no,
                path,
            })
        })
        .collect()
}

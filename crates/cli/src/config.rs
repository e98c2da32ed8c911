//! Settings loading shared by every command.
//!
//! Settings are read from a TOML file and merged with environment variables
//! prefixed with `WECHATPAY__`. For example, `WECHATPAY__MERCHANT__MCH_ID`
//! overrides `merchant.mch_id` in the file.

use std::path::Path;
use std::sync::Arc;

use wechatpay_signing::identity::SigningIdentity;
use wechatpay_signing::settings::Settings;

use crate::error::CliError;

pub(crate) fn load_settings(file: &Path) -> Result<Settings, CliError> {
    log::debug!("Loading settings from {}", file.display());
    Ok(Settings::from_file(file)?)
}

/// Loads settings and builds the signing identity they describe.
pub fn load_identity(file: &Path) -> Result<Arc<SigningIdentity>, CliError> {
    let settings = load_settings(file)?;
    let identity = SigningIdentity::from_settings(&settings)?;
    Ok(Arc::new(identity))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    pub(crate) const MERCHANT_KEY_PEM: &str =
        include_str!("../../signing/tests/fixtures/merchant_key.pem");
    pub(crate) const PLATFORM_CERT_PEM: &str =
        include_str!("../../signing/tests/fixtures/platform_cert.pem");
    pub(crate) const CERTIFICATES_RESPONSE_JSON: &str =
        include_str!("../../signing/tests/fixtures/certificates_response.json");
    pub(crate) const PLATFORM_CERT_SERIAL: &str = "5157F09EFDC096DE15EBE81A47057A7232F1B8E1";

    pub(crate) fn write_settings(with_platform: bool) -> NamedTempFile {
        let mut toml_str = format!(
            r#"
[merchant]
app_id = "wxd678efh567hg6787"
mch_id = "1900009191"
api_v3_key = "0123456789abcdef0123456789abcdef"
private_key_serial = "408B07E79B8269FEC3D5D3E6AB8ED163A6A380DB"
private_key_pem = """
{MERCHANT_KEY_PEM}"""
"#
        );
        if with_platform {
            toml_str.push_str(&format!(
                r#"
[platform]
certificate_pem = """
{PLATFORM_CERT_PEM}"""
"#
            ));
        }

        let mut file = NamedTempFile::new().expect("should create temp file");
        file.write_all(toml_str.as_bytes())
            .expect("should write settings");
        file
    }

    #[test]
    fn test_load_identity_without_platform() {
        let file = write_settings(false);
        let identity = load_identity(file.path()).expect("should load identity");
        assert_eq!(identity.mch_id(), "1900009191");
        assert!(identity.platform_certificate().is_none());
    }

    #[test]
    fn test_load_identity_with_platform() {
        let file = write_settings(true);
        let identity = load_identity(file.path()).expect("should load identity");
        let certificate = identity
            .platform_certificate()
            .expect("platform certificate should be loaded");
        assert_eq!(certificate.serial_no(), PLATFORM_CERT_SERIAL);
    }

    #[test]
    fn test_load_settings_missing_file() {
        let result = load_settings(Path::new("/nonexistent/wechatpay.toml"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}

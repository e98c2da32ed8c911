//! Configuration loading.
//!
//! Settings come from a TOML document merged with environment variables
//! prefixed `WECHATPAY__`, so secrets can be injected at deploy time, e.g.
//! `WECHATPAY__MERCHANT__API_V3_KEY` overrides `merchant.api_v3_key`.

use std::fmt;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::WechatPayError;

pub const ENVIRONMENT_PREFIX: &str = "WECHATPAY";

#[derive(Clone, Deserialize, Serialize, Validate)]
pub struct Merchant {
    #[validate(length(min = 1))]
    pub app_id: String,
    #[validate(length(min = 1))]
    pub mch_id: String,
    #[validate(length(equal = 32))]
    pub api_v3_key: String,
    #[validate(length(min = 1))]
    pub private_key_serial: String,
    #[validate(length(min = 1))]
    pub private_key_pem: String,
}

impl fmt::Debug for Merchant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Merchant")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("private_key_serial", &self.private_key_serial)
            .finish_non_exhaustive()
    }
}

/// Platform verification material. Either a certificate or a public key with
/// its identifier; both may be absent before the first certificate download.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Platform {
    #[serde(default)]
    pub certificate_pem: Option<String>,
    #[serde(default)]
    pub public_key_pem: Option<String>,
    #[serde(default)]
    pub public_key_serial: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub merchant: Merchant,
    #[serde(default)]
    #[validate(nested)]
    pub platform: Platform,
}

impl Settings {
    /// Parses settings from a TOML string and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is malformed, a required
    /// field is missing, or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<WechatPayError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let settings: Self = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .change_context(WechatPayError::Configuration {
                message: "Failed to load settings".into(),
            })?;

        settings
            .validate()
            .change_context(WechatPayError::Configuration {
                message: "Settings validation failed".into(),
            })?;

        Ok(settings)
    }

    /// Reads a TOML settings file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or the
    /// contents fail [`Settings::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, Report<WechatPayError>> {
        let content = std::fs::read_to_string(path).change_context(WechatPayError::Configuration {
            message: format!("Failed to read settings file {}", path.display()),
        })?;

        Self::from_toml(&content)
    }
}

//! Callback signature verification command.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};
use wechatpay_signing::identity::SigningIdentity;
use wechatpay_signing::verifier::{
    CallbackVerifier, HEADER_WECHATPAY_NONCE, HEADER_WECHATPAY_SERIAL, HEADER_WECHATPAY_SIGNATURE,
    HEADER_WECHATPAY_TIMESTAMP,
};

use crate::error::CliError;

/// Values copied from a received callback's `Wechatpay-*` headers.
pub struct CallbackArgs<'a> {
    pub timestamp: &'a str,
    pub nonce: &'a str,
    pub signature: &'a str,
    pub serial: Option<&'a str>,
}

/// Checks a saved callback body against its signature headers.
///
/// Returns [`CliError::Rejected`] for anything short of a valid signature,
/// including header values that are not legal HTTP header text.
pub fn verify_callback(
    identity: Arc<SigningIdentity>,
    args: &CallbackArgs<'_>,
    body_file: &Path,
) -> Result<(), CliError> {
    let body = fs::read(body_file)?;

    let mut headers = HeaderMap::new();
    let mut insert = |name: HeaderName, value: &str| -> Result<(), CliError> {
        let value = HeaderValue::from_str(value).map_err(|_| CliError::Rejected)?;
        headers.insert(name, value);
        Ok(())
    };
    insert(HEADER_WECHATPAY_TIMESTAMP, args.timestamp)?;
    insert(HEADER_WECHATPAY_NONCE, args.nonce)?;
    insert(HEADER_WECHATPAY_SIGNATURE, args.signature)?;
    if let Some(serial) = args.serial {
        insert(HEADER_WECHATPAY_SERIAL, serial)?;
    }

    if CallbackVerifier::new(identity).verify_headers(&headers, &body) {
        Ok(())
    } else {
        Err(CliError::Rejected)
    }
}

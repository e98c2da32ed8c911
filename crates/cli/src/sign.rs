//! Request and payment parameter signing commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use wechatpay_signing::identity::SigningIdentity;
use wechatpay_signing::pay_sign::PaySignBuilder;
use wechatpay_signing::signing::RequestSigner;

use crate::error::CliError;

/// Builds the `Authorization` header value for one request.
///
/// The body file is read as raw bytes and signed exactly as stored; no file
/// means an empty body.
pub fn authorization_header(
    identity: Arc<SigningIdentity>,
    method: &str,
    path: &str,
    body_file: Option<&Path>,
) -> Result<String, CliError> {
    let body = match body_file {
        Some(file) => fs::read(file)?,
        None => Vec::new(),
    };

    let method = method.to_ascii_uppercase();
    let header = RequestSigner::new(identity).authorization_header(&method, path, &body)?;
    Ok(header.to_string())
}

/// Builds the signed parameter set for the client payment widget, as JSON.
pub fn pay_params(identity: Arc<SigningIdentity>, prepay_id: &str) -> Result<String, CliError> {
    let params = PaySignBuilder::new(identity).client_payment_params(prepay_id)?;
    Ok(serde_json::to_string_pretty(&params)?)
}

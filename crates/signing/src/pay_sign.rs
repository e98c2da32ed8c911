//! Client-side payment invocation parameters.
//!
//! After a prepay order is created, the client-side payment widget is invoked
//! with five parameters, one of which (`paySign`) signs the other four
//! together with the app id.

use std::collections::BTreeMap;
use std::sync::Arc;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::error::WechatPayError;
use crate::identity::SigningIdentity;
use crate::signing::RequestSigner;

/// Fixed `signType` for RSA-signed payment parameters.
pub const PAY_SIGN_TYPE: &str = "RSA";

/// Parameters handed to the client-side payment widget.
///
/// Serializes with the widget's field names: `timeStamp`, `nonceStr`,
/// `package`, `paySign`, `signType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPaymentParams {
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub pay_sign: String,
    pub sign_type: String,
}

impl ClientPaymentParams {
    /// Flattens the parameters into a string map keyed by widget field name.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("timeStamp".to_string(), self.time_stamp),
            ("nonceStr".to_string(), self.nonce_str),
            ("package".to_string(), self.package),
            ("paySign".to_string(), self.pay_sign),
            ("signType".to_string(), self.sign_type),
        ])
    }
}

pub struct PaySignBuilder {
    signer: RequestSigner,
}

impl PaySignBuilder {
    #[must_use]
    pub fn new(identity: Arc<SigningIdentity>) -> Self {
        Self {
            signer: RequestSigner::new(identity),
        }
    }

    /// Builds signed payment parameters for `prepay_id`, with a timestamp and
    /// nonce of its own.
    ///
    /// # Errors
    ///
    /// Returns a signing error if the RSA operation fails.
    pub fn client_payment_params(
        &self,
        prepay_id: &str,
    ) -> Result<ClientPaymentParams, Report<WechatPayError>> {
        let app_id = self.signer.identity().app_id();
        let envelope = self.signer.sign_fresh(|timestamp, nonce| {
            canonical::pay_sign_message(app_id, timestamp, nonce, prepay_id)
        })?;

        Ok(ClientPaymentParams {
            time_stamp: envelope.timestamp.to_string(),
            nonce_str: envelope.nonce,
            package: canonical::package_value(prepay_id),
            pay_sign: envelope.signature,
            sign_type: PAY_SIGN_TYPE.to_string(),
        })
    }
}

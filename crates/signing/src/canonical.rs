//! Canonical message builders.
//!
//! The protocol signs three distinct newline-delimited forms. Each has its own
//! builder because the field sets and line counts differ. Fields are written
//! exactly as given: no trimming, no reordering, and every line (the last one
//! included, even when empty) ends with a single `\n`.

use std::fmt::Display;

fn push_line(message: &mut Vec<u8>, field: &[u8]) {
    message.extend_from_slice(field);
    message.push(b'\n');
}

/// Builds the message signed for an outbound API request:
/// `METHOD\nURL_PATH\nTIMESTAMP\nNONCE\nBODY\n`.
///
/// `url_path` is the absolute path including any query string; `body` must be
/// the exact bytes that go on the wire (empty for `GET`).
#[must_use]
pub fn request_message(
    method: &str,
    url_path: &str,
    timestamp: i64,
    nonce: &str,
    body: &[u8],
) -> Vec<u8> {
    let capacity = method.len() + url_path.len() + nonce.len() + body.len() + 32;
    let mut message = Vec::with_capacity(capacity);
    push_line(&mut message, method.as_bytes());
    push_line(&mut message, url_path.as_bytes());
    push_line(&mut message, timestamp.to_string().as_bytes());
    push_line(&mut message, nonce.as_bytes());
    push_line(&mut message, body);
    message
}

/// Builds the message signed for client-side payment invocation:
/// `APPID\nTIMESTAMP\nNONCE\nprepay_id=<id>\n`.
#[must_use]
pub fn pay_sign_message(app_id: &str, timestamp: i64, nonce: &str, prepay_id: &str) -> Vec<u8> {
    let package = package_value(prepay_id);
    let mut message = Vec::with_capacity(app_id.len() + nonce.len() + package.len() + 24);
    push_line(&mut message, app_id.as_bytes());
    push_line(&mut message, timestamp.to_string().as_bytes());
    push_line(&mut message, nonce.as_bytes());
    push_line(&mut message, package.as_bytes());
    message
}

/// Builds the message the gateway signs on callbacks:
/// `TIMESTAMP\nNONCE\nBODY\n`.
///
/// The timestamp stays a string: it is verified exactly as received.
#[must_use]
pub fn callback_message(timestamp: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + nonce.len() + body.len() + 3);
    push_line(&mut message, timestamp.as_bytes());
    push_line(&mut message, nonce.as_bytes());
    push_line(&mut message, body);
    message
}

/// The `package` value handed to the payment widget.
#[must_use]
pub fn package_value(prepay_id: &str) -> String {
    format!("prepay_id={prepay_id}")
}

/// Joins query parameters as `key=value` pairs sorted by key.
///
/// Used when building `GET` URLs only. Values are not percent-encoded, and the
/// resulting path is signed as-is by [`request_message`].
#[must_use]
pub fn sorted_query<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: Display,
{
    let mut pairs: Vec<(&str, &V)> = params.iter().map(|(k, v)| (k.as_ref(), v)).collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_message_layout() {
        let message = request_message(
            "POST",
            "/v3/pay/transactions/jsapi",
            1_700_000_000,
            "593BEC0C930BF1AFEB40B4A08C8FB242",
            br#"{"a":1}"#,
        );

        assert_eq!(
            message,
            b"POST\n/v3/pay/transactions/jsapi\n1700000000\n593BEC0C930BF1AFEB40B4A08C8FB242\n{\"a\":1}\n"
        );
    }

    #[test]
    fn test_request_message_empty_body_keeps_trailing_newline() {
        let message = request_message("GET", "/v3/certificates", 1, "n", b"");
        assert_eq!(message, b"GET\n/v3/certificates\n1\nn\n\n");
        assert_eq!(message.iter().filter(|&&b| b == b'\n').count(), 5);
    }

    #[test]
    fn test_request_message_does_not_trim() {
        let message = request_message("POST", "/p", 1, "n", b"  {\"a\": 1}\n");
        assert!(message.ends_with(b"  {\"a\": 1}\n\n"));
    }

    #[test]
    fn test_pay_sign_message_layout() {
        let message = pay_sign_message(
            "wx8888888888888888",
            1_414_561_699,
            "5K8264ILTKCH16CQ",
            "wx201410272009395522657a690389285100",
        );

        assert_eq!(
            message,
            b"wx8888888888888888\n1414561699\n5K8264ILTKCH16CQ\nprepay_id=wx201410272009395522657a690389285100\n"
        );
    }

    #[test]
    fn test_callback_message_layout() {
        let message = callback_message("1700000000", "fd9e5b3a", br#"{"id":"EV-1"}"#);
        assert_eq!(message, b"1700000000\nfd9e5b3a\n{\"id\":\"EV-1\"}\n");
    }

    #[test]
    fn test_callback_message_has_three_lines() {
        let message = callback_message("1", "n", b"");
        assert_eq!(message, b"1\nn\n\n");
    }

    #[test]
    fn test_sorted_query_orders_by_key() {
        let query = sorted_query(&[
            ("stock_creator_mchid", "1900000001".to_string()),
            ("offset", "0".to_string()),
            ("limit", "10".to_string()),
        ]);
        assert_eq!(query, "limit=10&offset=0&stock_creator_mchid=1900000001");
    }

    #[test]
    fn test_sorted_query_empty() {
        let params: [(&str, u32); 0] = [];
        assert_eq!(sorted_query(&params), "");
    }

    #[test]
    fn test_package_value() {
        assert_eq!(package_value("wx123"), "prepay_id=wx123");
    }
}

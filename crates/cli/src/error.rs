//! CLI error types.

use std::fmt;

use error_stack::Report;
use wechatpay_signing::error::WechatPayError;

#[derive(Debug)]
pub enum CliError {
    /// Settings or key material could not be loaded
    Config(String),
    /// Signing a request or payment parameters failed
    Signing(String),
    /// An envelope or certificate list could not be decrypted
    Decryption(String),
    /// The callback signature did not verify
    Rejected,
    /// IO error
    Io(std::io::Error),
    /// JSON serialization error
    Json(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Signing(msg) => write!(f, "Signing error: {}", msg),
            CliError::Decryption(msg) => write!(f, "Decryption error: {}", msg),
            CliError::Rejected => write!(f, "Callback signature is not authentic"),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err.to_string())
    }
}

impl From<Report<WechatPayError>> for CliError {
    fn from(report: Report<WechatPayError>) -> Self {
        let message = format!("{report:#}");
        match report.current_context() {
            WechatPayError::Configuration { .. } => CliError::Config(message),
            WechatPayError::Signing { .. } | WechatPayError::InvalidHeader { .. } => {
                CliError::Signing(message)
            }
            WechatPayError::Decryption { .. } | WechatPayError::InvalidResponse { .. } => {
                CliError::Decryption(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_cli_error_display() {
        assert_eq!(
            format!("{}", CliError::Config("test".into())),
            "Configuration error: test"
        );
        assert_eq!(
            format!("{}", CliError::Signing("test".into())),
            "Signing error: test"
        );
        assert_eq!(
            format!("{}", CliError::Decryption("test".into())),
            "Decryption error: test"
        );
        assert_eq!(
            format!("{}", CliError::Rejected),
            "Callback signature is not authentic"
        );
    }

    #[test]
    fn test_cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_cli_error_from_report() {
        let report = Report::new(WechatPayError::Decryption {
            message: "authentication tag mismatch".into(),
        });
        let cli_err: CliError = report.into();
        match cli_err {
            CliError::Decryption(msg) => assert!(msg.contains("authentication tag mismatch")),
            other => panic!("Expected Decryption variant, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_error_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.source().is_some());

        let config_err = CliError::Config("test".into());
        assert!(config_err.source().is_none());
    }
}

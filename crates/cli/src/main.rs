//! Merchant-side command line for the payment API v3 signing core.
//!
//! This tool provides commands for:
//! - Building the `Authorization` header for an outbound request
//! - Building signed parameters for the client payment widget
//! - Verifying a received callback signature
//! - Decrypting a saved platform certificate list response

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod certs;
mod config;
mod error;
mod logging;
mod sign;
mod verify;

use error::CliError;

#[derive(Parser)]
#[command(name = "wpcli")]
#[command(about = "Sign requests, verify callbacks and decrypt platform certificates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML settings file
    #[arg(
        long,
        short,
        global = true,
        env = "WECHATPAY_CONFIG",
        default_value = "wechatpay.toml"
    )]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Authorization header for a request
    Sign {
        /// HTTP method
        #[arg(long, short, default_value = "GET")]
        method: String,

        /// Request path including any query string, e.g. /v3/certificates
        #[arg(long, short)]
        path: String,

        /// File holding the exact request body bytes
        #[arg(long, short)]
        body_file: Option<PathBuf>,
    },

    /// Print signed client payment parameters as JSON
    PayParams {
        /// Prepay identifier returned when the order was created
        #[arg(long)]
        prepay_id: String,
    },

    /// Check a callback signature; exits non-zero unless authentic
    Verify {
        /// Value of the Wechatpay-Timestamp header
        #[arg(long)]
        timestamp: String,

        /// Value of the Wechatpay-Nonce header
        #[arg(long)]
        nonce: String,

        /// Value of the Wechatpay-Signature header
        #[arg(long)]
        signature: String,

        /// Value of the Wechatpay-Serial header
        #[arg(long)]
        serial: Option<String>,

        /// File holding the exact callback body bytes
        #[arg(long, short)]
        body_file: PathBuf,
    },

    /// Decrypt a saved /v3/certificates response
    DecryptCerts {
        /// File holding the certificate list response body
        #[arg(long, short)]
        response: PathBuf,

        /// Directory to write each certificate as <serial_no>.pem
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    logging::init_logger(cli.verbose)?;
    let identity = config::load_identity(&cli.config)?;

    match cli.command {
        Commands::Sign {
            method,
            path,
            body_file,
        } => {
            let body_file = body_file.as_deref();
            let header = sign::authorization_header(identity, &method, &path, body_file)?;
            println!("{}", header);
        }
        Commands::PayParams { prepay_id } => {
            println!("{}", sign::pay_params(identity, &prepay_id)?);
        }
        Commands::Verify {
            timestamp,
            nonce,
            signature,
            serial,
            body_file,
        } => {
            let args = verify::CallbackArgs {
                timestamp: &timestamp,
                nonce: &nonce,
                signature: &signature,
                serial: serial.as_deref(),
            };
            verify::verify_callback(identity, &args, &body_file)?;
            println!("Callback signature is authentic");
        }
        Commands::DecryptCerts {
            response,
            output_dir,
        } => {
            let summaries =
                certs::decrypt_certificates(identity, &response, output_dir.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}

use crate::error::CliError;

/// Routes library logging to stderr so stdout stays clean for command output.
pub fn init_logger(verbose: bool) -> Result<(), CliError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| CliError::Config(format!("Failed to initialize logger: {e}")))
}

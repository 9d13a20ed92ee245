//! Log output for the CLI: human readable events on stdout and, when
//! configured, hourly rotated JSON files.

use crate::{config::LoggingConfig, error::CliError};
use std::{ffi::OsStr, path::Path};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{filter::Targets, fmt, prelude::*};

/// Crates whose events reach stdout and the wallet log.
const WALLET_TARGETS: [&str; 3] = ["passkey_wallet_cli", "passkey_wallet_client", "passkey_wallet"];

/// Flushes the file writers when dropped. Hold it until exit.
#[must_use]
pub struct LogGuards(Vec<WorkerGuard>);

/// Install the global subscriber.
///
/// Stdout gets wallet events at `stdout_log_level`. With `log_files` set, the
/// wallet log gets every wallet event and the all log gets every event from
/// any crate.
pub fn init(config: &LoggingConfig) -> Result<LogGuards, CliError> {
    let mut guards = Vec::new();
    let (wallet_file, all_file) = match &config.log_files {
        Some(files) => {
            let (wallet_writer, wallet_guard) = hourly_writer(&files.wallet_logs_file_name)?;
            let (all_writer, all_guard) = hourly_writer(&files.all_logs_file_name)?;
            guards.extend([wallet_guard, all_guard]);
            (
                Some(
                    fmt::layer()
                        .json()
                        .with_writer(wallet_writer)
                        .with_filter(wallet_targets(Level::TRACE)),
                ),
                Some(fmt::layer().json().with_writer(all_writer)),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .with_filter(wallet_targets(config.stdout_log_level)),
        )
        .with(wallet_file)
        .with(all_file)
        .try_init()?;

    Ok(LogGuards(guards))
}

fn hourly_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), CliError> {
    let (dir, file_name) = split_log_path(path)?;
    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::hourly(dir, file_name),
    ))
}

/// tracing_appender wants the directory and the file name prefix apart.
fn split_log_path(path: &Path) -> Result<(&Path, &OsStr), CliError> {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(file_name)) => Ok((dir, file_name)),
        _ => Err(CliError::InvalidLogFilePath(path.into())),
    }
}

fn wallet_targets(level: Level) -> Targets {
    Targets::new().with_targets(WALLET_TARGETS.map(|target| (target, level)))
}

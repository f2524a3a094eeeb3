//! Tracing setup for the CLI and demos
//!
//! Terminal logs go to stderr so stdout stays usable for data URIs and JSON.
//! An optional file sink mirrors them without ANSI colors.

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Environment variable that overrides the configured level.
pub const LEVEL_ENV: &str = "QRCARD_LOG_LEVEL";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync + 'static>;

/// Install the global subscriber. A second call is a no-op.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = filter(std::env::var(LEVEL_ENV).ok().as_deref(), &options.level)?;
    let file = match options.file.as_deref() {
        Some(path) => Some(file_layer(path, options.rotation)?),
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(file)
        .with(terminal_layer(options.color))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Filter from the env override if present, otherwise the configured level.
pub fn filter(env_level: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let level = env_level
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(level).map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

fn file_layer(path: &Path, rotation: Option<LogRotation>) -> Result<BoxedLayer> {
    let (dir, name) = split_log_path(path)?;
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Config(format!("Failed to create log directory {}: {e}", dir.display())))?;

    let appender: RollingFileAppender = match rotation {
        Some(LogRotation::Hourly) => rolling::hourly(dir, name),
        Some(LogRotation::Daily) => rolling::daily(dir, name),
        None => rolling::never(dir, name),
    };
    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(appender);
    let _ = FILE_GUARD.set(guard);

    Ok(fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer)
        .boxed())
}

fn terminal_layer<S>(color: bool) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stderr)
        .with_ansi(color)
        .boxed()
}

/// Directory and file name of a log path; a bare name lives in the cwd.
fn split_log_path(path: &Path) -> Result<(&Path, &OsStr)> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("Log file path '{}' has no file name", path.display())))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_level_wins_over_config() {
        assert_eq!(filter(Some("debug"), "warn").unwrap().to_string(), "debug");
        assert_eq!(filter(Some("  "), "warn").unwrap().to_string(), "warn");
        assert_eq!(filter(None, "info").unwrap().to_string(), "info");
    }

    #[test]
    fn invalid_level_is_config_error() {
        assert!(matches!(
            filter(None, "qrcard=notalevel"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn log_path_splits_into_dir_and_name() {
        let (dir, name) = split_log_path(Path::new("logs/qrcard.log")).unwrap();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(name, "qrcard.log");

        let (dir, _) = split_log_path(Path::new("qrcard.log")).unwrap();
        assert_eq!(dir, Path::new("."));

        assert!(split_log_path(Path::new("/")).is_err());
    }
}

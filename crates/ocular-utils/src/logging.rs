//! # Logging Utilities
//!
//! Tracing setup for the Ocular crates.
//!
//! The object model logs through `tracing`: type-cache interning and module
//! changes at debug, unwind steps at trace, failed thread restores at warn.
//! This module installs the subscriber those events flow into, chosen once
//! at startup. When `RUST_LOG` is unset, the default filter keeps
//! third-party crates at `warn` and the `ocular_*` targets at the requested
//! level, so turning up verbosity does not drown the output in dependency
//! noise.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocular_utils::init_logging;
//!
//! // Reads RUST_LOG, OCULAR_LOG_FORMAT, and OCULAR_LOG_FILE. Hold the
//! // returned guard for the life of the process when file logging is on.
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Session opened");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Full filter override (e.g., `RUST_LOG=ocular_core=trace`)
//! - `OCULAR_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `OCULAR_LOG_FILE`: Optional path for a daily-rolling log file

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub use tracing_appender::non_blocking::WorkerGuard;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default for development)
    Pretty,
    /// JSON format (default for production)
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Initialize logging from environment variables
///
/// - `RUST_LOG`: full filter override; when unset the `ocular_*` targets
///   log at `info` and everything else at `warn`
/// - `OCULAR_LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
/// - `OCULAR_LOG_FILE`: optional path for a daily-rolling log file
///
/// Returns the file writer's flush guard when `OCULAR_LOG_FILE` is set;
/// hold it for the life of the process or buffered lines are lost.
///
/// ## Example
///
/// ```rust,no_run
/// use ocular_utils::init_logging;
///
/// let _guard = init_logging().expect("Failed to initialize logging");
/// tracing::info!("Session opened");
/// ```
///
/// ## Errors
///
/// Returns `LoggingError::InitializationFailed` when a global subscriber
/// is already installed.
pub fn init_logging() -> Result<Option<WorkerGuard>, LoggingError>
{
    let format = env::var("OCULAR_LOG_FORMAT")
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or(LogFormat::Pretty);

    init_logging_internal(format, Level::INFO)
}

/// Initialize logging with an explicit level and format
///
/// `RUST_LOG`, when set, still overrides the filter; the level argument
/// only feeds the default directives.
///
/// ## Example
///
/// ```rust,no_run
/// use ocular_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns `LoggingError::InitializationFailed` when a global subscriber
/// is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<Option<WorkerGuard>, LoggingError>
{
    init_logging_internal(format, level.into())
}

/// Default filter when `RUST_LOG` is unset: the Ocular crates at the
/// requested level, everything else at `warn`.
fn default_directives(level: Level) -> String
{
    format!("warn,ocular_core={level},ocular_utils={level}")
}

fn init_logging_internal(format: LogFormat, default_level: Level) -> Result<Option<WorkerGuard>, LoggingError>
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::with_capacity(2);
    layers.push(console_layer(format, env_filter.clone()));

    let guard = match env::var("OCULAR_LOG_FILE").ok().map(PathBuf::from) {
        Some(path) => {
            let (layer, guard) = file_layer(format, &path, env_filter);
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync>
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stdout)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stdout)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(
    format: LogFormat,
    path: &Path,
    filter: EnvFilter,
) -> (Box<dyn Layer<Registry> + Send + Sync>, WorkerGuard)
{
    let appender = tracing_appender::rolling::daily(
        path.parent().unwrap_or_else(|| Path::new(".")),
        path.file_name().unwrap_or_default(),
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };
    (layer, guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to install the global subscriber
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}

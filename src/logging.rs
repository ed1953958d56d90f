/// Structured logging for the fishing forecast service
///
/// Every event carries the data source it concerns and, where relevant, the
/// location or sensor it is about. Output goes to stderr or, for daemon
/// operation, to an append-only log file. Events are emitted through
/// `tracing`, so library code may also use the `tracing` macros directly.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::model::ProviderError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl LogLevel {
    fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    OpenMeteo,
    Almanac,
    Engine,
    Config,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::OpenMeteo => write!(f, "METEO"),
            DataSource::Almanac => write!(f, "ASTRO"),
            DataSource::Engine => write!(f, "ENGINE"),
            DataSource::Config => write!(f, "CONFIG"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. a fixture replay that has run past its data
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `min_level` when set. Calling this more
/// than once keeps the first subscriber. Fails only if `log_file` cannot be
/// opened for appending.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.filter_directive()));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);

    // try_init fails only when a subscriber is already installed.
    if console_timestamps || log_file.is_some() {
        let _ = builder.try_init();
    } else {
        let _ = builder.without_time().try_init();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, location: Option<&str>, message: &str) {
    tracing::info!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, location: Option<&str>, message: &str) {
    tracing::warn!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, location: Option<&str>, message: &str) {
    tracing::error!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, location: Option<&str>, message: &str) {
    tracing::debug!(source = %source, location = location.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a provider failure by what went wrong
pub fn classify_failure(err: &ProviderError) -> FailureType {
    match err {
        // Transport and decoding failures suggest an outage or an API change
        ProviderError::Http { .. } | ProviderError::Request(_) | ProviderError::Parse(_) => {
            FailureType::Unexpected
        }
        // The almanac does no I/O, so a failure is a bad input or a bug
        ProviderError::Ephemeris(_) => FailureType::Unexpected,
        // Missing blocks usually come with an API-side "reason" payload
        ProviderError::MissingField(_) => FailureType::Unknown,
        // A fixture replay that has run out of data
        ProviderError::Io(_) => FailureType::Expected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a provider failure with automatic classification
pub fn log_provider_failure(
    source: DataSource,
    location: &str,
    operation: &str,
    err: &ProviderError,
) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, Some(location), &message),
        FailureType::Unexpected => error(source, Some(location), &message),
        FailureType::Unknown => warn(source, Some(location), &message),
    }
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one scoring cycle across all configured locations
pub fn log_cycle_summary(total: usize, scored: usize, failed: usize) {
    let message = format!(
        "Scoring cycle complete: {}/{} locations scored, {} failed",
        scored, total, failed
    );

    if failed == 0 {
        info(DataSource::System, None, &message);
    } else if scored == 0 {
        error(DataSource::System, None, &message);
    } else {
        warn(DataSource::System, None, &message);
    }
}

//! # Logging Module
//!
//! Installs a `tracing` subscriber for hosts that do not bring their own.
//! The crate itself only emits events; it never installs a subscriber
//! implicitly.
//!
//! ## Environment Variables
//!
//! - `BRRTMVC_LOG_LEVEL`: `trace` / `debug` / `info` / `warn` / `error` (default `info`)
//! - `BRRTMVC_LOG_FORMAT`: `json` or `pretty` (default `json`)
//! - `BRRTMVC_LOG_ASYNC`: write through a background thread (default `false`)
//! - `BRRTMVC_LOG_TARGETS`: extra comma-separated filter directives,
//!   e.g. `brrtmvc::dispatcher=trace`
//! - `BRRTMVC_LOG_LOCATION`: include file and line (default `false`)
//!
//! `RUST_LOG` takes precedence over `BRRTMVC_LOG_LEVEL` when set.
//!
//! ```no_run
//! use brrtmvc::logging::{init_logging_with_config, LogConfig};
//!
//! let _guard = init_logging_with_config(&LogConfig::from_env())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a `tracing-appender` worker thread
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read the configuration from `BRRTMVC_LOG_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Verbose pretty output for local development and tests.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|s| s.trim().to_lowercase().parse().ok())
                .unwrap_or(default)
        };
        Self {
            log_level: lookup("BRRTMVC_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("BRRTMVC_LOG_FORMAT").map_or(defaults.format, |s| LogFormat::parse(&s)),
            async_logging: flag("BRRTMVC_LOG_ASYNC", defaults.async_logging),
            target_filter: lookup("BRRTMVC_LOG_TARGETS").filter(|s| !s.trim().is_empty()),
            include_location: flag("BRRTMVC_LOG_LOCATION", defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber.
///
/// # Returns
///
/// The worker guard when `async_logging` is on. Keep it alive for the life
/// of the process; dropping it flushes and stops the writer thread.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(guard)
}

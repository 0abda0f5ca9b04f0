//! Telemetry and tracing utilities
//!
//! Installs the global `tracing` subscriber: console output in text or JSON,
//! plus an optional log file written through a non-blocking appender.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragchat::telemetry::{init_subscriber, OutputFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .log_file("ragchat.log".into())
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::{RelayError, Result};

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format
    Json,
    /// Compact JSON format (no span list)
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(RelayError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write to stderr
    pub enable_console: bool,
    /// Also append to this file
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl TelemetryConfig {
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    fn filter(&self) -> EnvFilter {
        let level = level_name(self.log_level);
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("ragchat={level},warn")))
    }
}

/// Builder for [`TelemetryConfig`]
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl TelemetryConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        self.log_level = Some(parse_level(level)?);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Overlay settings from the environment
    ///
    /// - `RAGCHAT_LOG_LEVEL`: trace, debug, info, warn, error
    /// - `RAGCHAT_LOG_FORMAT`: text, json, json-compact
    /// - `RAGCHAT_LOG_FILE`: log file path
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = lookup("RAGCHAT_LOG_LEVEL") {
            self = self.log_level_str(&level)?;
        }
        if let Some(format) = lookup("RAGCHAT_LOG_FORMAT") {
            self = self.output_format(format.parse()?);
        }
        if let Some(file) = lookup("RAGCHAT_LOG_FILE") {
            self = self.log_file(PathBuf::from(file));
        }
        Ok(self)
    }

    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

fn parse_level(level: &str) -> Result<tracing::Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => Err(RelayError::ConfigurationError(format!(
            "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
        ))),
    }
}

const fn level_name(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    }
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn format_layer<W>(format: OutputFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        OutputFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        OutputFormat::JsonCompact => fmt::layer()
            .json()
            .with_span_list(false)
            .with_writer(writer)
            .with_target(true)
            .boxed(),
    }
}

/// Install the global subscriber.
///
/// Returns the file appender's guard when file logging is enabled; keep it
/// alive for the lifetime of the program. An already-installed subscriber is
/// not an error.
pub fn init_subscriber(config: TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.enable_console {
        layers.push(format_layer(config.output_format, std::io::stderr, true));
    }

    if let Some(path) = &config.log_file {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path.file_name().ok_or_else(|| {
            RelayError::ConfigurationError(format!("Invalid log file path: {}", path.display()))
        })?;
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(config.output_format, writer, false));
        guard = Some(worker_guard);
    }

    let init_result = tracing_subscriber::registry()
        .with(layers)
        .with(config.filter())
        .try_init();

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("global default trace dispatcher has already been set") {
                Ok(guard)
            } else {
                Err(RelayError::ConfigurationError(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        }
    }
}

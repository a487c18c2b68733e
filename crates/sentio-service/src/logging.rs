//! Logging and tracing setup for Sentio processes
//!
//! Built on `tracing`:
//! - Console output on stderr, pretty for development or JSON for log shippers
//! - Optional JSON file output with daily rotation
//! - `RUST_LOG` overrides the configured filter

use std::path::PathBuf;
use std::str::FromStr;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for rotated JSON log files; `None` disables file output
    pub log_dir: Option<PathBuf>,

    pub console_format: LogFormat,

    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Whether to log span open/close (for timing async operations)
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            console_format: LogFormat::Pretty,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            enable_spans: cfg!(debug_assertions),
            default_filter: "info,sentio_cli=debug,sentio_service=debug,sentio_connection=debug,sentio_driver_postgres=debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Structured console output and rotated files, no debug noise
    pub fn production() -> Self {
        Self {
            log_dir: Some(log_directory()),
            console_format: LogFormat::Json,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,sentio_cli=info,sentio_service=info,sentio_connection=info,sentio_driver_postgres=info".to_string(),
        }
    }

    pub fn development() -> Self {
        Self::default()
    }

    /// Console only, everything at debug
    pub fn testing() -> Self {
        Self {
            log_dir: None,
            console_format: LogFormat::Compact,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: "debug".to_string(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.console_format = format;
        self
    }

    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }
}

/// Keeps the file writer flushing; hold it until the process exits
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<LoggingGuard> {
    // RUST_LOG takes precedence over the configured filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW fires once when the span is created; ENTER would fire on every
    // re-poll of an awaited future.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone());
        let console_layer = match config.console_format {
            LogFormat::Pretty => console
                .with_ansi(true)
                .pretty()
                .with_filter(env_filter.clone())
                .boxed(),
            LogFormat::Compact => console
                .with_ansi(true)
                .compact()
                .with_filter(env_filter.clone())
                .boxed(),
            LogFormat::Json => console
                .with_ansi(false)
                .json()
                .with_current_span(true)
                .with_filter(env_filter.clone())
                .boxed(),
        };
        layers.push(console_layer);
    }

    let mut file_guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_appender = tracing_appender::rolling::daily(log_dir, "sentio.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        log_dir = ?config.log_dir,
        format = ?config.console_format,
        "Logging system initialized"
    );

    Ok(LoggingGuard { _file: file_guard })
}

/// Default location for rotated log files
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sentio")
        .join("logs")
}

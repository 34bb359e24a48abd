//! Structured logging setup for swarmview
//!
//! Installs a global `tracing` subscriber with JSONL or pretty console
//! output and optional rotating file output.
//!
//! # Quick Start
//!
//! ```ignore
//! use swarmview_logging::{LogConfig, SwarmviewSubscriberBuilder};
//!
//! // JSONL to console
//! SwarmviewSubscriberBuilder::new().init();
//!
//! // Pretty, verbose console output
//! SwarmviewSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! `RUST_LOG` replaces the configured directives entirely.

pub mod config;

pub use config::{
    ConsoleConfig, FileConfig, JsonlConfig, LogConfig, LogFormat, RotationStrategy, SWARMVIEW_TARGETS,
};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors from subscriber installation
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rolling appender could not be built
    #[error("File appender error: {0}")]
    Appender(String),

    /// Level or filter directive did not parse
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already set
    #[error("Subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builder for configuring and installing the swarmview subscriber
///
/// Console output is JSONL by default. Use [`LogConfig::development`] for
/// human-readable output.
pub struct SwarmviewSubscriberBuilder {
    config: LogConfig,
}

impl SwarmviewSubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base level for targets without an override
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Override the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config = self.config.with_target(target, level);
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber, reporting failures on stderr
    ///
    /// Keep the returned guard alive while file output is in use; dropping
    /// it flushes and stops the background writer.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("swarmview-logging: {e}");
                None
            }
        }
    }

    /// Install the subscriber globally
    ///
    /// Fails if a global subscriber is already set or file output cannot be
    /// opened.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => parse_filter(&self.config.directives())?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer()?);
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.jsonl_layer(writer));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

        Ok(guard)
    }

    fn console_layer(&self) -> Result<BoxedLayer, LoggingError> {
        let console = &self.config.console;

        let layer: BoxedLayer = match (console.format, console.test_writer) {
            (LogFormat::Pretty, true) => tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(console.ansi)
                .with_test_writer()
                .boxed(),
            (LogFormat::Pretty, false) => tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(console.ansi)
                .with_span_events(FmtSpan::CLOSE)
                .boxed(),
            (LogFormat::Jsonl, true) => self.jsonl_layer(tracing_subscriber::fmt::TestWriter::new()),
            (LogFormat::Jsonl, false) => self.jsonl_layer(std::io::stdout),
        };

        Ok(match &console.level {
            Some(level) => layer.with_filter(parse_filter(level)?).boxed(),
            None => layer,
        })
    }

    fn jsonl_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(jsonl.flatten_events)
            .with_span_list(jsonl.spans)
            .with_current_span(jsonl.spans)
            .with_file(jsonl.location)
            .with_line_number(jsonl.location)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for SwarmviewSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}

/// Non-blocking writer for file output; `Never` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.clone())
        .filename_suffix("log");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder
        .build(&config.directory)
        .map_err(|e| LoggingError::Appender(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Install the default subscriber (JSONL to console)
pub fn init_default() {
    SwarmviewSubscriberBuilder::new().init();
}

/// Install a verbose pretty-printing subscriber
pub fn init_development() {
    SwarmviewSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Install the test subscriber; safe to call from every test
pub fn init_testing() {
    let _ = SwarmviewSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

//! Process-wide log configuration.
//!
//! Records are written to a [`SharedStream`] as `log: <name>: [<LEVEL>] <message>`
//! lines, each starting on a fresh line even when the stream holds a partial
//! line of raw output (for example test runner progress dots).

pub mod format;
pub mod stream;

pub use format::LogLineFormat;
pub use stream::{LogSink, SharedStream};

use anyhow::{Context, Result};
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Targets that may log while tests run: the dispatcher and the test harness
pub const TESTING_TARGETS: &[&str] = &["pizza::cli", "pizza::harness"];

/// Explicit logging setup, applied once before anything logs
#[derive(Clone)]
pub struct LoggingConfig {
    pub stream: SharedStream,
    pub verbose: bool,
    pub testing: bool,
}

impl LoggingConfig {
    pub fn new(stream: SharedStream, verbose: bool, testing: bool) -> Self {
        Self {
            stream,
            verbose,
            testing,
        }
    }

    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }

    fn targets(&self) -> Targets {
        let level = self.level();
        if self.testing {
            TESTING_TARGETS
                .iter()
                .fold(Targets::new(), |targets, target| {
                    targets.with_target(*target, level)
                })
        } else {
            Targets::new().with_default(level)
        }
    }

    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(LogLineFormat::new(self.verbose))
            .with_writer(LogSink::new(self.stream.clone()))
            .with_filter(self.targets());

        tracing_subscriber::registry().with(layer)
    }

    /// Install as the global default. Fails if a global subscriber already exists.
    pub fn install(&self) -> Result<()> {
        tracing::subscriber::set_global_default(self.subscriber())
            .context("Failed to install the global log subscriber")
    }

    /// Install for the current thread only; dropping the guard resets logging
    pub fn install_scoped(&self) -> DefaultGuard {
        tracing::subscriber::set_default(self.subscriber())
    }
}

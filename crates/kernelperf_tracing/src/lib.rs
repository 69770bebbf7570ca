//! Tracing subscriber setup for kernelperf runs.
//!
//! ```rust,ignore
//! let session = kernelperf_tracing::subscriber()
//!     .env_filter("kernelperf=debug")
//!     .log_file("run.jsonl")
//!     .init()?;
//!
//! // ... run the suite ...
//!
//! session.stop();
//! ```

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{LevelFilter, ParseError},
    fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("invalid tracing filter: {0}")]
    Filter(#[from] ParseError),
    #[error("cannot create log file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Init(#[from] TryInitError),
}

pub struct TraceOptions {
    log_file: Option<PathBuf>,
    stdout: bool,
    pub env_filter: Option<String>,
}

/// This is a convenience tracing subscriber with some opinionated defaults.
///
/// Without an explicit filter, `RUST_LOG` is read and defaults to `info`.
pub fn subscriber() -> TraceOptions {
    TraceOptions {
        log_file: None,
        stdout: true,
        env_filter: None,
    }
}

impl TraceOptions {
    /// Also write every event as a JSON line to `path`.
    pub fn log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn env_filter(mut self, env_filter: impl ToString) -> Self {
        self.env_filter = Some(env_filter.to_string());
        self
    }

    /// Silences the terminal layer, e.g. while a progress bar owns stdout.
    pub fn quiet(mut self) -> Self {
        self.stdout = false;
        self
    }

    fn filter(&self) -> Result<EnvFilter, TraceError> {
        Ok(match &self.env_filter {
            Some(f) => EnvFilter::builder().parse(f)?,
            None => EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        })
    }

    /// Install as the global tracing subscriber
    pub fn init(self) -> Result<TraceSession, TraceError> {
        let filter = self.filter()?;
        let (file_layer, guard) = match &self.log_file {
            Some(path) => {
                let file = File::create(path)?;
                let (writer, guard) = tracing_appender::non_blocking(file);
                (Some(fmt::layer().json().with_writer(writer)), Some(guard))
            }
            None => (None, None),
        };
        let stdout_layer = self.stdout.then(|| fmt::layer().with_target(true));
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()?;
        Ok(TraceSession {
            _guard: guard,
            log_path: self.log_file,
        })
    }
}

pub struct TraceSession {
    _guard: Option<WorkerGuard>,
    pub log_path: Option<PathBuf>,
}

impl TraceSession {
    /// Flushes the file sink and ends the session.
    pub fn stop(self) -> Option<PathBuf> {
        self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_an_error() {
        let err = subscriber().env_filter("kernelperf=loudest").init().err().unwrap();
        assert!(matches!(err, TraceError::Filter(_)));
    }

    #[test]
    fn events_reach_the_log_file() {
        let path = std::env::temp_dir().join(format!("kernelperf-trace-{}.jsonl", std::process::id()));
        let session = subscriber()
            .env_filter("kernelperf=info")
            .log_file(&path)
            .quiet()
            .init()
            .unwrap();
        tracing::info!(target: "kernelperf::test", kernel = "INIT3", "hello");
        let path = session.stop().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(contents.contains("INIT3"));
        assert!(contents.contains("kernelperf::test"));
    }
}

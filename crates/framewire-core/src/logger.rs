//! Stderr logging for framewire hosts.
//!
//! Records are printed as `[elapsed LEVEL] scope: message`, where `scope` is
//! the last path segment of the emitting module (`image_writer`, `pipeline`).
//! The requested level applies to framewire's own crates; every other crate
//! is capped at `warn` so image codecs do not drown the component output.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "framewire";
const FOREIGN_CAP: LevelFilter = LevelFilter::Warn;

fn level_for(target: &str, level: LevelFilter) -> LevelFilter {
    if target.starts_with(OWN_PREFIX) {
        level
    } else {
        level.min(FOREIGN_CAP)
    }
}

/// `framewire_components::image_writer` -> `image_writer`.
fn scope(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

struct HostLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= level_for(metadata.target(), self.level)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{:8.3}s {:>5}] {}: {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            scope(record.target()),
            record.args()
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<HostLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| HostLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// `EnvFilter` directive matching the `log` policy above.
#[cfg(feature = "tracing")]
fn filter_directive(level: LevelFilter) -> String {
    let own = level.as_str().to_ascii_lowercase();
    let foreign = level.min(FOREIGN_CAP).as_str().to_ascii_lowercase();
    format!("{foreign},{OWN_PREFIX}={own}")
}

/// Install a `tracing` subscriber at `level`; `RUST_LOG` takes precedence.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

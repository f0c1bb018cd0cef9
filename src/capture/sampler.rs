use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::Value;
use tokio::time::MissedTickBehavior;

use crate::capture::extract::{extract_vector3, Position};
use crate::capture::sink::{LogRecord, RecordSink};
use crate::error::Result;
use crate::nbt;

/// Tick period used when `intervalLog` is absent or unusable.
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

const PRIMARY_FIELD: &str = "Pos";
const FALLBACK_FIELD: &str = "pos";

/// Resolve the configured tick period. Numbers and numeric strings are
/// milliseconds; anything not finite and strictly positive falls back to
/// [`DEFAULT_INTERVAL_MS`].
pub fn resolve_interval(raw: Option<&Value>) -> Duration {
    let millis = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    millis
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
        .filter(|period| !period.is_zero())
        .unwrap_or(Duration::from_millis(DEFAULT_INTERVAL_MS))
}

/// Where each tick reads its position from.
pub trait PositionSource: Send + Sync {
    fn read_position(&self) -> Result<Position>;
}

impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    fn read_position(&self) -> Result<Position> {
        (**self).read_position()
    }
}

/// A player save file, re-read and decoded in full on every call.
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionSource for SaveFile {
    fn read_position(&self) -> Result<Position> {
        let bytes = std::fs::read(&self.path)?;
        let tree = nbt::parse(&bytes)?;
        extract_vector3(&tree, PRIMARY_FIELD, FALLBACK_FIELD)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Logged(LogRecord),
    Unchanged,
}

/// Change-filtered position logger.
///
/// Idle until the first successful read, then tracks the last logged
/// position. A tick appends a record when the position differs from the
/// last one, when `force_same` is set, or on the first read. The last
/// position only moves after the record is written, so a failed tick
/// leaves it untouched and the next tick retries from the same state.
pub struct Sampler<S, K, C = SystemClock> {
    source: S,
    sink: K,
    clock: C,
    force_same: bool,
    last: Option<Position>,
}

impl<S: PositionSource, K: RecordSink> Sampler<S, K, SystemClock> {
    pub fn new(source: S, sink: K, force_same: bool) -> Self {
        Self::with_clock(source, sink, SystemClock, force_same)
    }
}

impl<S: PositionSource, K: RecordSink, C: Clock> Sampler<S, K, C> {
    pub fn with_clock(source: S, sink: K, clock: C, force_same: bool) -> Self {
        Self {
            source,
            sink,
            clock,
            force_same,
            last: None,
        }
    }

    /// Last logged position; `None` while idle.
    pub fn last(&self) -> Option<Position> {
        self.last
    }

    pub fn tick(&mut self) -> Result<TickOutcome> {
        let position = self.source.read_position()?;

        if !self.force_same && self.last == Some(position) {
            return Ok(TickOutcome::Unchanged);
        }

        let record = LogRecord {
            captured_at: self.clock.now(),
            position,
        };
        self.sink.append(&record)?;
        self.last = Some(position);
        Ok(TickOutcome::Logged(record))
    }

    /// Run one tick and report the result; errors stop here.
    pub fn tick_and_report(&mut self) {
        match self.tick() {
            Ok(TickOutcome::Logged(record)) => {
                tracing::info!(record = %record, "Logged position");
            }
            Ok(TickOutcome::Unchanged) => {
                tracing::debug!("Position unchanged, skipping log");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record player position");
            }
        }
    }

    /// Tick immediately, then every `period` measured from the start.
    /// Ticks run one at a time on this task; a slow tick delays the next
    /// one instead of overlapping it. Never returns.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick_and_report();
        }
    }
}

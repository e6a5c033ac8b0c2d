//! Structured, levelled logging with named timers.
//!
//! Every component logs through a [`Logger`]. A logger is a cheap handle over a
//! [`LogSink`]; the default sink forwards to `tracing`, so installing a
//! subscriber (see [`init_tracing`]) decides where records end up.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Logger`] | Levelled logging plus `time`/`time_end` timers |
//! | [`LogSink`] | Trait for log destinations |
//! | [`TracingSink`] | Default sink, emits `tracing` events |
//! | [`InMemoryLogSink`] | Bounded in-memory sink for tests |
//! | [`CompositeLogSink`] | Fan-out to several sinks |
//!
//! Logging never fails the caller: sink panics are caught and dropped, and
//! poisoned locks are recovered.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Install a `tracing-subscriber` fmt layer filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` when `RUST_LOG` is unset or invalid.
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Open string-keyed metadata attached to a log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of `base` not already present here are added.
    fn extend_from(&mut self, base: &Metadata) {
        for (k, v) in &base.0 {
            self.0.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("{}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub metadata: Metadata,
    pub timestamp: f64,
}

/// A log destination. Implementations must not block for long.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

/// Forwards records to `tracing` under the `travel_assist` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let meta = record.metadata.to_string();
        match record.level {
            LogLevel::Debug => tracing::debug!(target: "travel_assist", metadata = %meta, "{}", record.message),
            LogLevel::Info => tracing::info!(target: "travel_assist", metadata = %meta, "{}", record.message),
            LogLevel::Warn => tracing::warn!(target: "travel_assist", metadata = %meta, "{}", record.message),
            LogLevel::Error => tracing::error!(target: "travel_assist", metadata = %meta, "{}", record.message),
        }
    }
}

/// In-memory sink for testing. Keeps the newest `max_records`.
pub struct InMemoryLogSink {
    records: RwLock<VecDeque<LogRecord>>,
    max_records: usize,
}

impl InMemoryLogSink {
    pub fn new(max: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max.max(1),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        let guard = self.records.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().cloned().collect()
    }

    pub fn records_at(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for InMemoryLogSink {
    fn emit(&self, record: &LogRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push_back(record.clone());
        while records.len() > self.max_records {
            records.pop_front();
        }
    }
}

/// Composite sink for multiple destinations.
#[derive(Default)]
pub struct CompositeLogSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl CompositeLogSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LogSink for CompositeLogSink {
    fn emit(&self, record: &LogRecord) {
        for s in &self.sinks {
            let _ = catch_unwind(AssertUnwindSafe(|| s.emit(record)));
        }
    }
}

/// Levelled logger handle. Clones share the sink and the timer table.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    timers: Arc<Mutex<HashMap<String, Instant>>>,
    base: Metadata,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("base", &self.base).finish()
    }
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            timers: Arc::new(Mutex::new(HashMap::new())),
            base: Metadata::new(),
        }
    }

    /// Child logger that stamps `key = value` on every record.
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut child = self.clone();
        child.base.insert(key, value);
        child
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, metadata: &Metadata) {
        let mut metadata = metadata.clone();
        metadata.extend_from(&self.base);
        let record = LogRecord {
            level,
            message: message.into(),
            metadata,
            timestamp: timestamp(),
        };
        let _ = catch_unwind(AssertUnwindSafe(|| self.sink.emit(&record)));
    }

    pub fn debug(&self, message: impl Into<String>, metadata: &Metadata) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn info(&self, message: impl Into<String>, metadata: &Metadata) {
        self.log(LogLevel::Info, message, metadata);
    }

    pub fn warn(&self, message: impl Into<String>, metadata: &Metadata) {
        self.log(LogLevel::Warn, message, metadata);
    }

    pub fn error(&self, message: impl Into<String>, metadata: &Metadata) {
        self.log(LogLevel::Error, message, metadata);
    }

    /// Start (or restart) the timer named `label`.
    pub fn time(&self, label: impl Into<String>) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.insert(label.into(), Instant::now());
    }

    /// Stop the timer named `label` and log its duration.
    pub fn time_end(&self, label: &str) -> Option<Duration> {
        let started = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            timers.remove(label)
        };
        match started {
            Some(start) => {
                let elapsed = start.elapsed();
                self.debug(
                    format!("{}: {}ms", label, elapsed.as_millis()),
                    &Metadata::new()
                        .with("timer", label)
                        .with("duration_ms", elapsed.as_millis() as u64),
                );
                Some(elapsed)
            }
            None => {
                self.warn(
                    format!("timer '{}' does not exist", label),
                    &Metadata::new().with("timer", label),
                );
                None
            }
        }
    }

    /// Number of timers started and not yet ended, across all clones.
    pub fn active_timers(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

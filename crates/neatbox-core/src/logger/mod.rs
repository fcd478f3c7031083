//! # Neatbox Request Logger
//!
//! The `logger` service. Every message is forwarded to the [`log`] facade and
//! also kept in an in-memory buffer together with the time elapsed since the
//! logger was created, so an application can dump the log of a single
//! request (for example into a debug footer).
//!
//! Logging never fails: if the buffer is busy the record is only forwarded.
use std::cell::RefCell;
use std::fmt;
use std::time::{Duration, Instant};

use log::Level;
use serde_json::Value;

/// One buffered log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    /// Time since the logger was created.
    pub elapsed: Duration,
    /// Structured context supplied with the message.
    pub extra: Value,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>9.3}ms] {:<5} {}",
            self.elapsed.as_secs_f64() * 1000.0,
            self.level,
            self.message
        )?;
        if !self.extra.is_null() {
            write!(f, " {}", self.extra)?;
        }
        Ok(())
    }
}

/// Buffered logger registered as the `logger` service.
pub struct Logger {
    started: Instant,
    records: RefCell<Vec<LogRecord>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("records_count", &self.records.try_borrow().map(|r| r.len()).unwrap_or(0))
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            records: RefCell::new(Vec::new()),
        }
    }

    /// Record a message at `level` with optional structured context.
    pub fn log(&self, level: Level, message: impl Into<String>, extra: Value) {
        let message = message.into();
        if extra.is_null() {
            log::log!(target: "neatbox", level, "{}", message);
        } else {
            log::log!(target: "neatbox", level, "{} {}", message, extra);
        }

        let record = LogRecord {
            level,
            message,
            elapsed: self.started.elapsed(),
            extra,
        };
        if let Ok(mut records) = self.records.try_borrow_mut() {
            records.push(record);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message, Value::Null);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message, Value::Null);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warn, message, Value::Null);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message, Value::Null);
    }

    /// Log a timing checkpoint. The elapsed time is part of every record,
    /// this just makes the checkpoint explicit.
    pub fn log_time(&self, message: impl Into<String>) {
        let message = format!("{} (time: {:.3}ms)", message.into(), self.elapsed_ms());
        self.log(Level::Debug, message, Value::Null);
    }

    /// Log a database query with its bound parameters and duration.
    pub fn log_query(&self, query: &str, params: Value, duration: Duration) {
        let message = format!("Query ({:.3}ms): {}", duration.as_secs_f64() * 1000.0, query);
        self.log(Level::Debug, message, params);
    }

    /// Milliseconds since the logger was created.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// A copy of every buffered record.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.try_borrow().map(|r| r.clone()).unwrap_or_default()
    }

    /// The buffered records, one formatted line each.
    pub fn dump(&self) -> String {
        self.records()
            .iter()
            .map(|record| record.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//! Structured records for renderer failures.
//!
//! Sinks are additive: recording never fails and never influences what the
//! pipeline does next.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One renderer failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    /// The original, un-normalized math text.
    pub tex: String,
    pub message: String,
    /// Serialized as RFC 3339.
    pub time: DateTime<Utc>,
}

impl DiagnosticRecord {
    pub fn now(tex: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tex: tex.into(),
            message: message.into(),
            time: Utc::now(),
        }
    }
}

pub trait DiagnosticSink {
    fn record(&self, record: DiagnosticRecord);
}

/// Drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _record: DiagnosticRecord) {}
}

/// Forwards records to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, record: DiagnosticRecord) {
        log::warn!(
            target: "webtex::diagnostics",
            "[{}] {}: {:?}",
            record.time.to_rfc3339(),
            record.message,
            record.tex
        );
    }
}

/// Keeps records in memory, for tests and for the CLI's JSON dump.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.records()).unwrap_or_else(|_| "[]".to_string())
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn record(&self, record: DiagnosticRecord) {
        (**self).record(record)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<T> {
    fn record(&self, record: DiagnosticRecord) {
        (**self).record(record)
    }
}

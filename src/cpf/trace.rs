//! Resolution trace recorded while a CPF is resolved
//!
//! The trace is observational: it is returned with the verdict for audit and
//! display, and nothing in the resolver ever reads it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Severity of a trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Info,
    Ok,
    Warn,
    Error,
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TraceLevel::Info => "INFO",
            TraceLevel::Ok => "OK",
            TraceLevel::Warn => "WARN",
            TraceLevel::Error => "ERROR",
        };
        f.pad(label)
    }
}

/// One timestamped line of the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub at: DateTime<Utc>,
    pub level: TraceLevel,
    pub message: String,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<5} {}",
            self.at.format("%H:%M:%S%.3f"),
            self.level,
            self.message
        )
    }
}

/// Ordered trace builder. Each entry is also mirrored to `tracing`.
#[derive(Debug, Default)]
pub struct ResolutionTrace {
    entries: Vec<TraceEntry>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Info, message.into());
    }

    pub fn ok(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Ok, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(TraceLevel::Error, message.into());
    }

    fn push(&mut self, level: TraceLevel, message: String) {
        // Soft failures never reach error level in the log; they are expected
        match level {
            TraceLevel::Info => debug!(target: "checadoc::cpf", "{}", message),
            TraceLevel::Ok => info!(target: "checadoc::cpf", "{}", message),
            TraceLevel::Warn | TraceLevel::Error => {
                warn!(target: "checadoc::cpf", "{}", message)
            }
        }
        self.entries.push(TraceEntry {
            at: Utc::now(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut trace = ResolutionTrace::new();
        trace.info("querying");
        trace.error("timed out");
        trace.ok("done");

        let levels: Vec<TraceLevel> = trace.entries().iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![TraceLevel::Info, TraceLevel::Error, TraceLevel::Ok]
        );
        assert!(trace.entries()[0].at <= trace.entries()[2].at);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&TraceLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
    }

    #[test]
    fn test_entry_display_contains_level_and_message() {
        let mut trace = ResolutionTrace::new();
        trace.warn("proxy returned HTTP 503");
        let line = trace.entries()[0].to_string();
        assert!(line.contains("WARN"));
        assert!(line.contains("proxy returned HTTP 503"));
    }
}

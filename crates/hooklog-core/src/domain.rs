use std::fmt;

use chrono::{DateTime, Utc};

/// Log severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warn",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details carried by a log event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Short, single-line description.
    pub summary: String,
    /// Full multi-line detail (stack trace, cause chain). May be empty.
    pub diagnostic_text: String,
}

impl ErrorInfo {
    pub fn new(summary: impl Into<String>, diagnostic_text: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            diagnostic_text: diagnostic_text.into(),
        }
    }

    /// Build from a std error: `summary` is its display text, `diagnostic_text`
    /// is the cause chain (empty when the error has no source).
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut diagnostic_text = String::new();
        let mut source = err.source();
        if source.is_some() {
            diagnostic_text.push_str(&err.to_string());
            diagnostic_text.push_str("\n\nCaused by:");
            let mut idx = 0usize;
            while let Some(cause) = source {
                diagnostic_text.push_str(&format!("\n    {idx}: {cause}"));
                idx += 1;
                source = cause.source();
            }
        }

        Self {
            summary: err.to_string(),
            diagnostic_text,
        }
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostic_text.is_empty()
    }
}

/// A single log record handed to the sink.
#[derive(Clone, Debug)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub logger_name: String,
    pub message: String,
    pub error: Option<ErrorInfo>,
}

impl LogEvent {
    pub fn new(
        severity: Severity,
        logger_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            logger_name: logger_name.into(),
            message: message.into(),
            error: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}

//! Log event → notification payload (cards, plain text, attachments).
//!
//! Everything here is pure: no I/O, no shared state.

use chrono::{DateTime, Timelike, Utc};

use crate::{config::SinkConfig, domain::LogEvent, domain::Severity};

pub const STACK_TRACE_FILENAME: &str = "stack-trace.txt";
pub const EXCEPTION_FIELD_NAME: &str = "Exception";

/// Fixed per-severity presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeverityStyle {
    pub emoji: &'static str,
    pub label: &'static str,
    pub color: Option<u32>,
}

pub fn style(severity: Severity) -> SeverityStyle {
    let (emoji, label, color) = match severity {
        Severity::Trace => (":page_with_curl:", "Trace message", None),
        Severity::Debug => (":gear:", "Debug message", None),
        Severity::Info => (":information_source:", "Info", Some(3901635)),
        Severity::Warning => (":warning:", "Warning", Some(16763981)),
        Severity::Error => (":x:", "Error", Some(14495300)),
        Severity::Fatal => (":stop_sign:", "Fatal Error", Some(9319490)),
    };
    SeverityStyle {
        emoji,
        label,
        color,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

/// Rich presentation (Discord embed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub description: String,
    pub color: Option<u32>,
    pub footer: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<CardField>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    PlainText(String),
    Card(Card),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentationPayload {
    pub body: Body,
    pub mention_suffix: Option<String>,
    pub attachment: Option<Attachment>,
}

impl PresentationPayload {
    pub fn plain_text(&self) -> Option<&str> {
        match &self.body {
            Body::PlainText(t) => Some(t),
            Body::Card(_) => None,
        }
    }

    pub fn card(&self) -> Option<&Card> {
        match &self.body {
            Body::Card(c) => Some(c),
            Body::PlainText(_) => None,
        }
    }

    /// Free text sent as message content (or file caption).
    ///
    /// Plain text path: body + mention. Card path: the mention alone, or
    /// nothing when mentions are off.
    pub fn text(&self) -> Option<String> {
        let mention = self.mention_suffix.as_deref();
        match (&self.body, mention) {
            (Body::PlainText(t), Some(m)) => Some(format!("{t}{m}")),
            (Body::PlainText(t), None) => Some(t.clone()),
            (Body::Card(_), Some(m)) => Some(m.to_string()),
            (Body::Card(_), None) => None,
        }
    }
}

/// Build the payload for one event. `rendered` is the layout output.
pub fn present(event: &LogEvent, rendered: &str, cfg: &SinkConfig) -> PresentationPayload {
    let body = if cfg.use_cards {
        Body::Card(build_card(event, rendered))
    } else {
        Body::PlainText(rendered.to_string())
    };

    let attachment = event
        .error
        .as_ref()
        .filter(|e| e.has_diagnostics())
        .map(|e| Attachment {
            filename: STACK_TRACE_FILENAME.to_string(),
            bytes: e.diagnostic_text.as_bytes().to_vec(),
        });

    PresentationPayload {
        body,
        mention_suffix: cfg.mention().map(str::to_string),
        attachment,
    }
}

fn build_card(event: &LogEvent, rendered: &str) -> Card {
    let s = style(event.severity);
    let ts = event.timestamp;

    let mut fields = Vec::new();
    if let Some(err) = &event.error {
        fields.push(CardField {
            name: EXCEPTION_FIELD_NAME.to_string(),
            value: err.summary.clone(),
        });
    }

    Card {
        title: format!("{} {} in {}", s.emoji, s.label, event.logger_name),
        description: rendered.to_string(),
        color: s.color,
        footer: format!(
            "sec: {} ms: {}",
            ts.second(),
            ts.timestamp_subsec_millis().min(999)
        ),
        timestamp: ts,
        fields,
    }
}

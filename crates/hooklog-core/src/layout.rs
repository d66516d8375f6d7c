//! Message body rendering (`${token}` templates).

use regex::Regex;

use crate::{domain::LogEvent, errors::Error, Result};

pub const DEFAULT_LAYOUT: &str = "${message}";

/// Renders the body text of a log event.
///
/// Implementations must be pure: the same event always renders the same text.
pub trait Layout: Send + Sync {
    fn render(&self, event: &LogEvent) -> Result<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Message,
    Logger,
    Level,
    LongDate,
    Exception,
}

impl Token {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "message" => Some(Token::Message),
            "logger" => Some(Token::Logger),
            "level" => Some(Token::Level),
            "longdate" => Some(Token::LongDate),
            "exception" => Some(Token::Exception),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// Template layout, e.g. `"${longdate} [${level}] ${message}"`.
///
/// Supported tokens: `message`, `logger`, `level`, `longdate`, `exception`.
/// Unknown tokens are rejected when the template is parsed.
#[derive(Clone, Debug)]
pub struct TemplateLayout {
    source: String,
    segments: Vec<Segment>,
}

impl TemplateLayout {
    pub fn parse(template: &str) -> Result<Self> {
        let token_re = Regex::new(r"\$\{([A-Za-z_]+)\}").expect("valid regex");

        let mut segments = Vec::new();
        let mut last = 0usize;
        for caps in token_re.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 always matches");
            let name = caps[1].to_ascii_lowercase();
            let token = Token::parse(&name).ok_or_else(|| {
                Error::Config(format!("unknown layout token `${{{name}}}` in {template:?}"))
            })?;

            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            segments.push(Segment::Token(token));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            source: DEFAULT_LAYOUT.to_string(),
            segments: vec![Segment::Token(Token::Message)],
        }
    }
}

impl Layout for TemplateLayout {
    fn render(&self, event: &LogEvent) -> Result<String> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Token(Token::Message) => out.push_str(&event.message),
                Segment::Token(Token::Logger) => out.push_str(&event.logger_name),
                Segment::Token(Token::Level) => out.push_str(event.severity.as_str()),
                Segment::Token(Token::LongDate) => {
                    // Four fractional digits; leap seconds report nanos >= 1e9.
                    let frac = (event.timestamp.timestamp_subsec_nanos() / 100_000).min(9999);
                    out.push_str(&format!(
                        "{}.{frac:04}",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S")
                    ));
                }
                Segment::Token(Token::Exception) => {
                    if let Some(err) = &event.error {
                        out.push_str(&err.summary);
                    }
                }
            }
        }
        Ok(out)
    }
}

//! `tracing` bridge: forwards tracing events to a webhook sink.
//!
//! ```no_run
//! let layer = hooklog_tracing::layer_from_env()?;
//! hooklog_tracing::init("my-service", Some(layer))?;
//! tracing::error!(fatal = true, "database unreachable");
//! # Ok::<(), hooklog_core::Error>(())
//! ```

use std::{fmt, sync::Arc};

use chrono::Utc;
use tracing::{
    field::{Field, Visit},
    Event, Level, Metadata, Subscriber,
};
use tracing_subscriber::{
    fmt as tfmt, layer::Context, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use hooklog_core::{
    config::SinkConfig,
    domain::{ErrorInfo, LogEvent, Severity},
    errors::Error,
    sink::{BlockingSink, WebhookSink},
    Result,
};
use hooklog_discord::DiscordWebhookClient;

/// Targets never forwarded: our own crates and the HTTP stack used to deliver.
const IGNORED_TARGETS: &[&str] = &["hooklog", "reqwest", "hyper", "h2", "rustls", "tokio_util"];

/// Initialize logging: stderr fmt output plus the optional webhook layer.
///
/// Default filter is `info` for everything, overridable with `RUST_LOG`.
pub fn init(service_name: &str, webhook: Option<WebhookLayer>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tfmt::layer().with_target(false).with_ansi(true))
        .with(webhook)
        .try_init()
        .map_err(|e| Error::Config(format!("logging init failed: {e}")))
}

/// Build a Discord-backed layer from `HOOKLOG_*` environment variables.
pub fn layer_from_env() -> Result<WebhookLayer> {
    WebhookLayer::discord(SinkConfig::load()?)
}

/// Forwards every tracing event at or above `min_severity` to the sink.
///
/// Delivery blocks the emitting thread until the webhook answered. Failures
/// cannot be returned through `tracing`, so they are reported on stderr.
pub struct WebhookLayer {
    sink: Arc<BlockingSink>,
    min_severity: Severity,
}

impl WebhookLayer {
    pub fn new(sink: BlockingSink) -> Self {
        Self {
            sink: Arc::new(sink),
            min_severity: Severity::Trace,
        }
    }

    pub fn discord(cfg: SinkConfig) -> Result<Self> {
        let client = DiscordWebhookClient::new(&cfg)?;
        let sink = WebhookSink::new(cfg, Arc::new(client))?;
        Ok(Self::new(BlockingSink::new(sink)?))
    }

    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }
}

impl<S: Subscriber> Layer<S> for WebhookLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_ignored(meta.target()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let log_event = visitor.into_log_event(meta);
        if log_event.severity < self.min_severity {
            return;
        }

        if let Err(e) = self.sink.notify(log_event) {
            eprintln!("[hooklog] webhook delivery failed: {e}");
        }
    }
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::") || rest.starts_with('_'))
    })
}

fn severity_for(level: &Level, fatal: bool) -> Severity {
    match *level {
        Level::TRACE => Severity::Trace,
        Level::DEBUG => Severity::Debug,
        Level::INFO => Severity::Info,
        Level::WARN => Severity::Warning,
        _ if fatal => Severity::Fatal,
        _ => Severity::Error,
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
    error: Option<ErrorInfo>,
    backtrace: Option<String>,
    fatal: bool,
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "backtrace" | "stack_trace" => self.backtrace = Some(value),
            "error" if self.error.is_none() => self.error = Some(ErrorInfo::new(value, "")),
            name => self.fields.push((name, value)),
        }
    }

    fn into_log_event(self, meta: &Metadata<'_>) -> LogEvent {
        let mut message = self.message.unwrap_or_default();
        for (name, value) in &self.fields {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&format!("{name}={value}"));
        }

        let mut error = self.error;
        if let Some(bt) = self.backtrace.filter(|s| !s.is_empty()) {
            let info = error.get_or_insert_with(|| ErrorInfo::new(message.clone(), ""));
            info.diagnostic_text = bt;
        }

        LogEvent {
            timestamp: Utc::now(),
            severity: severity_for(meta.level(), self.fatal),
            logger_name: meta.target().to_string(),
            message,
            error,
        }
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "fatal" {
            self.fatal = value;
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if field.name() == "error" || self.error.is_none() {
            self.error = Some(ErrorInfo::from_error(value));
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{value:?}"));
    }
}

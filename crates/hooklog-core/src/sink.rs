//! The sink entry point: render → present → deliver.

use std::sync::{mpsc, Arc};

use tokio::runtime::Runtime;

use crate::{
    config::SinkConfig,
    delivery::port::DeliveryPort,
    domain::LogEvent,
    errors::Error,
    layout::{Layout, TemplateLayout},
    presenter::{present, PresentationPayload},
    Result,
};

/// Delivers log events to one webhook.
///
/// The delivery client is handed in fully constructed and reused for every
/// call. `notify` resolves only after the remote call finished; failures are
/// returned as-is, never retried or buffered.
pub struct WebhookSink {
    cfg: SinkConfig,
    layout: Arc<dyn Layout>,
    delivery: Arc<dyn DeliveryPort>,
}

impl WebhookSink {
    pub fn new(cfg: SinkConfig, delivery: Arc<dyn DeliveryPort>) -> Result<Self> {
        cfg.validate()?;
        let layout = Arc::new(TemplateLayout::parse(&cfg.layout)?);
        Ok(Self {
            cfg,
            layout,
            delivery,
        })
    }

    /// Replace the template layout with a custom renderer.
    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn config(&self) -> &SinkConfig {
        &self.cfg
    }

    /// Build the payload for an event without sending it.
    pub fn prepare(&self, event: &LogEvent) -> Result<PresentationPayload> {
        let rendered = self.layout.render(event)?;
        Ok(present(event, &rendered, &self.cfg))
    }

    pub async fn notify(&self, event: &LogEvent) -> Result<()> {
        let payload = self.prepare(event)?;
        self.deliver(&payload).await
    }

    async fn deliver(&self, payload: &PresentationPayload) -> Result<()> {
        let text = payload.text();
        let card = payload.card();

        match &payload.attachment {
            Some(att) => {
                tracing::debug!(
                    filename = %att.filename,
                    bytes = att.bytes.len(),
                    "delivering log event with attachment"
                );
                self.delivery
                    .send_file_with_caption(&att.bytes, &att.filename, text.as_deref(), card)
                    .await
            }
            None => {
                tracing::debug!(card = card.is_some(), "delivering log event");
                self.delivery.send_text(text.as_deref(), card).await
            }
        }
    }
}

/// Thread-blocking front for [`WebhookSink`], for callers outside async code.
///
/// Deliveries run on a dedicated single-worker runtime; the calling thread
/// waits on a std channel, so this also works from inside another runtime.
pub struct BlockingSink {
    sink: Arc<WebhookSink>,
    runtime: Option<Runtime>,
}

impl BlockingSink {
    pub fn new(sink: WebhookSink) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("hooklog-delivery")
            .enable_all()
            .build()?;
        Ok(Self {
            sink: Arc::new(sink),
            runtime: Some(runtime),
        })
    }

    pub fn sink(&self) -> &WebhookSink {
        &self.sink
    }

    pub fn notify(&self, event: LogEvent) -> Result<()> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| Error::Transport("delivery runtime is shut down".to_string()))?;

        let (tx, rx) = mpsc::sync_channel(1);
        let sink = self.sink.clone();
        runtime.spawn(async move {
            let _ = tx.send(sink.notify(&event).await);
        });

        rx.recv().map_err(|_| {
            Error::Transport("delivery task ended without reporting a result".to_string())
        })?
    }
}

impl Drop for BlockingSink {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics; shut it down detached.
        if let Some(rt) = self.runtime.take() {
            rt.shutdown_background();
        }
    }
}

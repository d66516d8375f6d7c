//! Discord webhook adapter (reqwest).
//!
//! This crate implements the `hooklog-core` DeliveryPort over the Discord
//! "execute webhook" endpoint. Cards map to embeds; attachments are sent as
//! multipart uploads with the message fields in `payload_json`.

use async_trait::async_trait;
use serde::Serialize;

use hooklog_core::{
    config::SinkConfig, delivery::port::DeliveryPort, errors::Error, presenter::Card, Result,
};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api";

/// One webhook, one HTTP client.
///
/// `reqwest::Client` pools connections internally and is safe to share across
/// tasks and threads, so concurrent sends go through it without extra locking.
#[derive(Clone, Debug)]
pub struct DiscordWebhookClient {
    webhook_id: u64,
    token: String,
    api_base: String,
    http: reqwest::Client,
}

impl DiscordWebhookClient {
    pub fn new(cfg: &SinkConfig) -> Result<Self> {
        cfg.validate_destination()?;
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::Transport(format!("http client build error: {e}")))?;
        Ok(Self {
            webhook_id: cfg.webhook_id,
            token: cfg.webhook_token.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            http,
        })
    }

    /// Point the client at another API root (proxies, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn webhook_id(&self) -> u64 {
        self.webhook_id
    }

    fn execute_url(&self) -> String {
        // `wait=true` makes Discord report delivery errors instead of accepting blindly.
        format!(
            "{}/webhooks/{}/{}?wait=true",
            self.api_base, self.webhook_id, self.token
        )
    }

    async fn check(resp: reqwest::Response) -> Result<()> {
        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Transport(format!(
            "discord webhook rejected request: {status} {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    fn map_err(e: reqwest::Error) -> Error {
        Error::Transport(format!("discord request error: {e}"))
    }
}

#[derive(Serialize)]
struct MessageBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    embeds: Vec<Embed<'a>>,
}

impl<'a> MessageBody<'a> {
    fn new(content: Option<&'a str>, card: Option<&'a Card>) -> Self {
        Self {
            content,
            embeds: card.map(Embed::from).into_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    footer: EmbedFooter<'a>,
    timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField<'a>>,
}

#[derive(Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

impl<'a> From<&'a Card> for Embed<'a> {
    fn from(card: &'a Card) -> Self {
        Self {
            title: &card.title,
            description: &card.description,
            color: card.color,
            footer: EmbedFooter { text: &card.footer },
            timestamp: card.timestamp.to_rfc3339(),
            fields: card
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: &f.name,
                    value: &f.value,
                    inline: false,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl DeliveryPort for DiscordWebhookClient {
    async fn send_text(&self, text: Option<&str>, card: Option<&Card>) -> Result<()> {
        let body = MessageBody::new(text, card);
        let resp = self
            .http
            .post(self.execute_url())
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(resp).await
    }

    async fn send_file_with_caption(
        &self,
        bytes: &[u8],
        filename: &str,
        caption: Option<&str>,
        card: Option<&Card>,
    ) -> Result<()> {
        let payload_json = serde_json::to_string(&MessageBody::new(caption, card))?;

        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload_json)
            .part(
                "files[0]",
                reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string())
                    .mime_str("text/plain; charset=utf-8")
                    .map_err(|e| Error::Transport(format!("discord multipart error: {e}")))?,
            );

        let resp = self
            .http
            .post(self.execute_url())
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(resp).await
    }
}

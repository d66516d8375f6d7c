use async_trait::async_trait;

use crate::{presenter::Card, Result};

/// Outbound channel to a single webhook destination.
///
/// Implementations are created once per sink and shared by every call, so they
/// must tolerate concurrent use. Each call makes exactly one delivery attempt
/// and resolves only once the remote side answered (or the transport failed).
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Plain message: optional text, optional accompanying card.
    async fn send_text(&self, text: Option<&str>, card: Option<&Card>) -> Result<()>;

    /// Named file attachment with an optional caption and card.
    async fn send_file_with_caption(
        &self,
        bytes: &[u8],
        filename: &str,
        caption: Option<&str>,
        card: Option<&Card>,
    ) -> Result<()>;
}

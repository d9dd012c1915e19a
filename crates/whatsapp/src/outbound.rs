use std::sync::Arc;

use {
    async_trait::async_trait,
    chatrelay_channels::{ChannelOutbound, Error, Result},
    chatrelay_common::types::MediaAttachment,
    tokio::sync::RwLock,
    tracing::debug,
};

use crate::{
    sidecar::SidecarHandle,
    types::{GatewayMessage, new_request_id},
};

/// Sends replies through the currently connected sidecar.
#[derive(Clone)]
pub struct WhatsAppOutbound {
    sidecar: Arc<RwLock<Option<SidecarHandle>>>,
}

impl WhatsAppOutbound {
    pub fn new(sidecar: Arc<RwLock<Option<SidecarHandle>>>) -> Self {
        Self { sidecar }
    }

    async fn request(&self, message: GatewayMessage) -> Result<()> {
        let sidecar = self.sidecar.read().await;
        let handle = sidecar
            .as_ref()
            .ok_or_else(|| Error::unavailable("whatsapp sidecar is not connected"))?;
        handle.request(message).await
    }
}

#[async_trait]
impl ChannelOutbound for WhatsAppOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        debug!(to, len = text.len(), "sending whatsapp text");
        self.request(GatewayMessage::SendText {
            request_id: new_request_id(),
            to: to.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn send_media(&self, to: &str, media: &MediaAttachment) -> Result<()> {
        debug!(to, filename = %media.filename, mime_type = %media.mime_type, "sending whatsapp media");
        self.request(GatewayMessage::SendMedia {
            request_id: new_request_id(),
            to: to.to_string(),
            media: media.clone(),
        })
        .await
    }

    async fn send_media_url(&self, to: &str, url: &str) -> Result<()> {
        debug!(to, url, "sending whatsapp media url");
        self.request(GatewayMessage::SendMediaUrl {
            request_id: new_request_id(),
            to: to.to_string(),
            url: url.to_string(),
        })
        .await
    }
}

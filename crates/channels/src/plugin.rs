use std::{fmt, sync::Arc};

use {
    async_trait::async_trait,
    chatrelay_common::types::MediaAttachment,
    tracing::{info, warn},
};

use crate::Result;

/// Messaging frontends known to chatrelay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    WhatsappWeb,
    Console,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhatsappWeb => "whatsapp_web",
            Self::Console => "console",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Channel events (pub/sub) ────────────────────────────────────────────────

/// Lifecycle events emitted by channel plugins.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A login QR code is waiting to be scanned. Rendering is up to the sink.
    QrCode {
        channel_type: ChannelType,
        qr: String,
    },
    Authenticated {
        channel_type: ChannelType,
    },
    Ready {
        channel_type: ChannelType,
    },
    Disconnected {
        channel_type: ChannelType,
        reason: Option<String>,
    },
    InboundMessage {
        channel_type: ChannelType,
        chat_id: String,
        from_me: bool,
    },
}

/// Sink for channel events; the binary decides what to do with them.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    async fn emit(&self, event: ChannelEvent);
}

/// Event sink that only writes structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

#[async_trait]
impl ChannelEventSink for LogEventSink {
    async fn emit(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::QrCode { channel_type, qr } => {
                info!(%channel_type, qr_len = qr.len(), "login QR code received");
            },
            ChannelEvent::Authenticated { channel_type } => {
                info!(%channel_type, "authenticated");
            },
            ChannelEvent::Ready { channel_type } => {
                info!(%channel_type, "client is ready");
            },
            ChannelEvent::Disconnected {
                channel_type,
                reason,
            } => {
                warn!(%channel_type, ?reason, "disconnected");
            },
            ChannelEvent::InboundMessage {
                channel_type,
                chat_id,
                from_me,
            } => {
                info!(%channel_type, chat_id, from_me, "inbound message");
            },
        }
    }
}

/// Core channel plugin trait. Each messaging platform implements this.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "whatsapp_web").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Connect and process inbound messages until the connection ends.
    async fn run(&self) -> anyhow::Result<()>;

    /// Shared outbound adapter for sending messages.
    fn outbound(&self) -> Arc<dyn ChannelOutbound>;
}

/// Send messages to a channel.
///
/// Every method resolves once the platform has acknowledged the delivery.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;
    async fn send_media(&self, to: &str, media: &MediaAttachment) -> Result<()>;
    /// Send a remote media reference without re-uploading its content.
    async fn send_media_url(&self, to: &str, url: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_display() {
        assert_eq!(ChannelType::WhatsappWeb.to_string(), "whatsapp_web");
        assert_eq!(ChannelType::Console.as_str(), "console");
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let event = ChannelEvent::InboundMessage {
            channel_type: ChannelType::WhatsappWeb,
            chat_id: "123@c.us".into(),
            from_me: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "inbound_message");
        assert_eq!(json["channel_type"], "whatsapp_web");
        assert_eq!(json["chat_id"], "123@c.us");
    }

    #[tokio::test]
    async fn log_sink_accepts_every_event() {
        let sink = LogEventSink;
        sink.emit(ChannelEvent::Ready {
            channel_type: ChannelType::WhatsappWeb,
        })
        .await;
        sink.emit(ChannelEvent::Disconnected {
            channel_type: ChannelType::WhatsappWeb,
            reason: Some("closed".into()),
        })
        .await;
    }
}

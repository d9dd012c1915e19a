//! JSON frames exchanged with the WhatsApp Web sidecar.

use {
    chatrelay_common::types::{InboundMessage, MediaAttachment},
    serde::{Deserialize, Serialize},
};

/// Frames sent by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarMessage {
    /// Login QR code; only present until the session is authenticated.
    Qr {
        qr: String,
    },
    Authenticated,
    Ready,
    /// Any message created in a chat, including ones sent by us.
    MessageCreate {
        message: WhatsAppMessage,
    },
    /// Outcome of a [`GatewayMessage`] with the same `request_id`.
    Ack {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// A chat message as reported by WhatsApp Web.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessage {
    /// Message kind: `chat` for plain text, `image`, `sticker`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub body: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub from_me: bool,
}

impl WhatsAppMessage {
    /// Only plain text messages can carry commands.
    pub fn is_chat(&self) -> bool {
        self.kind == "chat"
    }

    /// Where replies go: our own messages are answered in the chat they were
    /// sent to, everything else back to its sender.
    pub fn reply_chat_id(&self) -> &str {
        if self.from_me { &self.to } else { &self.from }
    }

    /// The message as seen by the chatbot; the conversation is always `to`.
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage::new(self.body.clone(), self.to.clone())
    }
}

/// Frames sent to the sidecar. Each one is acknowledged with an
/// [`SidecarMessage::Ack`] carrying the same `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayMessage {
    SendText {
        request_id: String,
        to: String,
        text: String,
    },
    SendMedia {
        request_id: String,
        to: String,
        media: MediaAttachment,
    },
    SendMediaUrl {
        request_id: String,
        to: String,
        url: String,
    },
}

impl GatewayMessage {
    pub fn request_id(&self) -> &str {
        match self {
            Self::SendText { request_id, .. }
            | Self::SendMedia { request_id, .. }
            | Self::SendMediaUrl { request_id, .. } => request_id,
        }
    }
}

pub(crate) fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

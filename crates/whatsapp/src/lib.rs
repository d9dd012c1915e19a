//! WhatsApp Web channel for chatrelay.
//!
//! Talks to a WhatsApp Web sidecar over a WebSocket. Plain chat messages are
//! handed to the chatbot; its replies go back through the same sidecar.

pub mod outbound;
pub mod plugin;
pub mod sidecar;
pub mod types;

pub use {
    outbound::WhatsAppOutbound,
    plugin::WhatsAppPlugin,
    sidecar::{SidecarHandle, connect_with_retry},
    types::{GatewayMessage, SidecarMessage, WhatsAppMessage},
};

//! WhatsApp Web channel plugin.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_channels::{
        ChannelEvent, ChannelEventSink, ChannelOutbound, ChannelPlugin, ChannelType,
        LogEventSink,
    },
    chatrelay_chatbot::Chatbot,
    chatrelay_config::WhatsAppConfig,
    tokio::sync::RwLock,
    tracing::{debug, error, info, warn},
};

use crate::{
    outbound::WhatsAppOutbound,
    sidecar::{MessageCallback, SidecarHandle, connect_with_retry},
    types::{SidecarMessage, WhatsAppMessage},
};

/// Bridges WhatsApp Web chats to the chatbot.
pub struct WhatsAppPlugin {
    config: WhatsAppConfig,
    chatbot: Arc<Chatbot>,
    sidecar: Arc<RwLock<Option<SidecarHandle>>>,
    event_sink: Arc<dyn ChannelEventSink>,
}

impl WhatsAppPlugin {
    pub fn new(config: WhatsAppConfig, chatbot: Arc<Chatbot>) -> Self {
        Self {
            config,
            chatbot,
            sidecar: Arc::new(RwLock::new(None)),
            event_sink: Arc::new(LogEventSink),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub async fn is_connected(&self) -> bool {
        self.sidecar
            .read()
            .await
            .as_ref()
            .is_some_and(SidecarHandle::is_connected)
    }

    fn message_callback(&self) -> MessageCallback {
        let chatbot = Arc::clone(&self.chatbot);
        let outbound = self.outbound();
        let sink = Arc::clone(&self.event_sink);
        Arc::new(move |msg| {
            handle_sidecar_message(msg, Arc::clone(&chatbot), Arc::clone(&outbound), Arc::clone(&sink));
        })
    }
}

#[async_trait]
impl ChannelPlugin for WhatsAppPlugin {
    fn id(&self) -> &str {
        ChannelType::WhatsappWeb.as_str()
    }

    fn name(&self) -> &str {
        "WhatsApp Web"
    }

    async fn run(&self) -> Result<()> {
        info!(url = %self.config.sidecar_url, "starting whatsapp web channel");
        let (handle, closed) = connect_with_retry(&self.config, self.message_callback()).await?;
        *self.sidecar.write().await = Some(handle);

        let reason = closed.await.unwrap_or_default();
        *self.sidecar.write().await = None;
        warn!(?reason, "whatsapp sidecar connection closed");
        self.event_sink
            .emit(ChannelEvent::Disconnected {
                channel_type: ChannelType::WhatsappWeb,
                reason,
            })
            .await;
        Ok(())
    }

    fn outbound(&self) -> Arc<dyn ChannelOutbound> {
        Arc::new(WhatsAppOutbound::new(Arc::clone(&self.sidecar)))
    }
}

/// Handle a non-ack frame from the sidecar. Never blocks the socket reader.
fn handle_sidecar_message(
    msg: SidecarMessage,
    chatbot: Arc<Chatbot>,
    outbound: Arc<dyn ChannelOutbound>,
    sink: Arc<dyn ChannelEventSink>,
) {
    let channel_type = ChannelType::WhatsappWeb;
    let event = match msg {
        SidecarMessage::Qr { qr } => ChannelEvent::QrCode { channel_type, qr },
        SidecarMessage::Authenticated => ChannelEvent::Authenticated { channel_type },
        SidecarMessage::Ready => ChannelEvent::Ready { channel_type },
        SidecarMessage::Disconnected { reason } => ChannelEvent::Disconnected {
            channel_type,
            reason,
        },
        SidecarMessage::MessageCreate { message } => {
            if !message.is_chat() {
                debug!(kind = %message.kind, from = %message.from, "ignoring non-chat message");
                return;
            }
            let event = ChannelEvent::InboundMessage {
                channel_type,
                chat_id: message.reply_chat_id().to_owned(),
                from_me: message.from_me,
            };
            tokio::spawn(handle_message(chatbot, outbound, message));
            event
        },
        SidecarMessage::Ack { request_id, .. } => {
            debug!(request_id, "unrouted ack");
            return;
        },
    };
    tokio::spawn(async move { sink.emit(event).await });
}

async fn handle_message(
    chatbot: Arc<Chatbot>,
    outbound: Arc<dyn ChannelOutbound>,
    message: WhatsAppMessage,
) {
    let chat_id = message.reply_chat_id().to_owned();
    let dispatcher = Arc::new(chatbot.dispatcher(outbound, chat_id.clone()));
    match chatbot.invoke(&message.to_inbound(), dispatcher).await {
        Ok(outcome) => debug!(chat_id, ?outcome, "message handled"),
        Err(e) => error!(chat_id, error = %e, "failed to handle message"),
    }
}

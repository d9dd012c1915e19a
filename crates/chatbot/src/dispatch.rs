//! Turn decoded replies into channel deliveries.

use std::sync::Arc;

use {
    async_trait::async_trait,
    chatrelay_channels::ChannelOutbound,
    chatrelay_common::types::{MediaAttachment, ReplyItem},
    chatrelay_config::ChatbotConfig,
};

use crate::{
    error::Result,
    observer::{InvocationEvent, InvocationObserver, TracingObserver},
};

/// Consumer of the replies produced by one invocation.
///
/// The chatbot calls `handle` once per reply, each on its own task.
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    async fn handle(&self, item: ReplyItem) -> Result<()>;
}

/// Delivers replies to one chat through a channel's outbound adapter.
pub struct ReplyDispatcher {
    outbound: Arc<dyn ChannelOutbound>,
    chat_id: String,
    error_message: String,
    observer: Arc<dyn InvocationObserver>,
}

impl ReplyDispatcher {
    pub fn new(outbound: Arc<dyn ChannelOutbound>, chat_id: impl Into<String>) -> Self {
        Self {
            outbound,
            chat_id: chat_id.into(),
            error_message: ChatbotConfig::default().error_message,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Text used for error replies that carry none.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Deliver one reply.
    ///
    /// Text goes out before attachments; attachments go out one at a time in
    /// list order, each awaited before the next.
    pub async fn dispatch(&self, item: &ReplyItem) -> Result<()> {
        if item.skipped {
            self.observer.on_event(&InvocationEvent::ReplySkipped {
                text: item.text.as_deref(),
            });
            return Ok(());
        }

        if let Some(text) = item.error_text(&self.error_message) {
            self.outbound.send_text(&self.chat_id, text).await?;
            return Ok(());
        }

        if let Some(text) = item.text.as_deref().filter(|t| !t.is_empty()) {
            self.outbound.send_text(&self.chat_id, text).await?;
        }

        for (position, image) in item.images.iter().enumerate() {
            let index = position + 1;
            match (&image.image_data, &image.url) {
                (Some(data), _) => {
                    let media = MediaAttachment::numbered(index, data);
                    self.outbound.send_media(&self.chat_id, &media).await?;
                },
                (None, Some(url)) => {
                    self.outbound.send_media_url(&self.chat_id, url).await?;
                },
                (None, None) => {
                    self.observer
                        .on_event(&InvocationEvent::EmptyAttachment { index });
                },
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ReplyHandler for ReplyDispatcher {
    async fn handle(&self, item: ReplyItem) -> Result<()> {
        self.dispatch(&item).await
    }
}

use std::{io::Write, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_channels::{ChannelOutbound, ChannelType},
    chatrelay_chatbot::{Chatbot, InvocationOutcome},
    chatrelay_common::types::{InboundMessage, MediaAttachment},
    tokio::sync::Mutex,
};

/// Outbound that prints deliveries instead of sending them anywhere.
pub struct ConsoleOutbound {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleOutbound {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    async fn print(&self, line: String) -> chatrelay_channels::Result<()> {
        let mut out = self.out.lock().await;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| chatrelay_channels::Error::external("console output", e))
    }
}

#[async_trait]
impl ChannelOutbound for ConsoleOutbound {
    async fn send_text(&self, to: &str, text: &str) -> chatrelay_channels::Result<()> {
        self.print(format!("[{to}] {text}")).await
    }

    async fn send_media(
        &self,
        to: &str,
        media: &MediaAttachment,
    ) -> chatrelay_channels::Result<()> {
        self.print(format!(
            "[{to}] <{} {}, {} base64 chars>",
            media.filename,
            media.mime_type,
            media.data.len()
        ))
        .await
    }

    async fn send_media_url(&self, to: &str, url: &str) -> chatrelay_channels::Result<()> {
        self.print(format!("[{to}] <{url}>")).await
    }
}

pub async fn invoke(chatbot: &Chatbot, message: &str, group: &str) -> Result<()> {
    let outbound = Arc::new(ConsoleOutbound::stdout());
    let dispatcher = Arc::new(chatbot.dispatcher(outbound, ChannelType::Console.as_str()));

    match chatbot
        .invoke(&InboundMessage::new(message, group), dispatcher)
        .await?
    {
        InvocationOutcome::Skipped(reason) => eprintln!("{}", reason.describe(message)),
        InvocationOutcome::Completed { replies } => eprintln!("{replies} reply(ies) delivered"),
    }
    Ok(())
}

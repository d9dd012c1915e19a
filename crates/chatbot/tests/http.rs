#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end invocations against a mock command service.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    chatrelay_channels::ChannelOutbound,
    chatrelay_chatbot::{Chatbot, InvocationOutcome, ReplyHandler, Result},
    chatrelay_common::types::{InboundMessage, MediaAttachment, ReplyItem},
    chatrelay_config::ChatbotConfig,
    mockito::Matcher,
    serde_json::json,
};

#[derive(Default)]
struct Collect(Mutex<Vec<ReplyItem>>);

#[async_trait]
impl ReplyHandler for Collect {
    async fn handle(&self, item: ReplyItem) -> Result<()> {
        self.0.lock().unwrap().push(item);
        Ok(())
    }
}

impl Collect {
    fn texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|i| i.text.clone())
            .collect();
        texts.sort();
        texts
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<String>>);

#[async_trait]
impl ChannelOutbound for Outbox {
    async fn send_text(&self, to: &str, text: &str) -> chatrelay_channels::Result<()> {
        self.0.lock().unwrap().push(format!("text {to} {text}"));
        Ok(())
    }

    async fn send_media(
        &self,
        to: &str,
        media: &MediaAttachment,
    ) -> chatrelay_channels::Result<()> {
        self.0
            .lock()
            .unwrap()
            .push(format!("media {to} {} {}", media.filename, media.mime_type));
        Ok(())
    }

    async fn send_media_url(&self, to: &str, url: &str) -> chatrelay_channels::Result<()> {
        self.0.lock().unwrap().push(format!("url {to} {url}"));
        Ok(())
    }
}

fn chatbot(server: &mockito::ServerGuard) -> Chatbot {
    Chatbot::new(&ChatbotConfig::default().with_service_host(server.url())).unwrap()
}

#[tokio::test]
async fn command_is_posted_once_and_replies_are_delivered() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chatbot")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "message": "!ping",
            "groupId": "group-1",
            "platform": "WhatsApp",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"text":"pong"},{"text":"again"}]"#)
        .expect(1)
        .create_async()
        .await;

    let handler = Arc::new(Collect::default());
    let outcome = chatbot(&server)
        .invoke(&InboundMessage::new("!ping", "group-1"), handler.clone())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome, InvocationOutcome::Completed { replies: 2 });
    assert_eq!(handler.texts(), ["again", "pong"]);
}

#[tokio::test]
async fn chunked_body_is_decoded_incrementally() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chatbot")
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(b"[{\"text\":")?;
            w.write_all(b"\"a\"},")?;
            w.write_all(b"{\"text\":\"b\"}]")
        })
        .create_async()
        .await;

    let handler = Arc::new(Collect::default());
    let outcome = chatbot(&server)
        .invoke(&InboundMessage::new("!roll d20", "g"), handler.clone())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome, InvocationOutcome::Completed { replies: 2 });
    assert_eq!(handler.texts(), ["a", "b"]);
}

#[tokio::test]
async fn message_without_command_never_reaches_the_service() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let handler = Arc::new(Collect::default());
    let outcome = chatbot(&server)
        .invoke(&InboundMessage::new("good morning", "g"), handler.clone())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(matches!(outcome, InvocationOutcome::Skipped(_)));
    assert!(handler.0.lock().unwrap()[0].skipped);
}

#[tokio::test]
async fn server_error_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chatbot")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let handler = Arc::new(Collect::default());
    let err = chatbot(&server)
        .invoke(&InboundMessage::new("!ping", "g"), handler.clone())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("upstream exploded"));
    assert!(handler.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_decode_failure_after_valid_replies() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chatbot")
        .with_status(200)
        .with_body(r#"[{"text":"first"},{"text":42}]"#)
        .create_async()
        .await;

    let handler = Arc::new(Collect::default());
    let err = chatbot(&server)
        .invoke(&InboundMessage::new("!ping", "g"), handler.clone())
        .await
        .unwrap_err();

    assert!(err.is_decode());
    assert_eq!(handler.texts(), ["first"]);
}

#[tokio::test]
async fn attachments_reach_the_channel_in_order() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chatbot")
        .with_status(200)
        .with_body(
            json!([{
                "text": "two pictures",
                "images": [
                    {"url": "http://cdn/1.png"},
                    {"imageData": {
                        "mimeType": "image/png",
                        "content": "iVBORw0KGgo=",
                        "name": "f",
                        "extension": "png",
                    }},
                ],
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let bot = chatbot(&server);
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Arc::new(bot.dispatcher(outbox.clone(), "chat-9"));
    bot.invoke(&InboundMessage::new("!pics", "g"), dispatcher)
        .await
        .unwrap();

    assert_eq!(*outbox.0.lock().unwrap(), [
        "text chat-9 two pictures",
        "url chat-9 http://cdn/1.png",
        "media chat-9 2-f.png image/png",
    ]);
}

#[tokio::test]
async fn error_reply_without_text_uses_configured_fallback() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chatbot")
        .with_status(200)
        .with_body(r#"[{"error":true}]"#)
        .create_async()
        .await;

    let mut config = ChatbotConfig::default().with_service_host(server.url());
    config.error_message = "Nope.".into();
    let bot = Chatbot::new(&config).unwrap();
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Arc::new(bot.dispatcher(outbox.clone(), "chat-1"));
    bot.invoke(&InboundMessage::new("!fail", "g"), dispatcher)
        .await
        .unwrap();

    assert_eq!(*outbox.0.lock().unwrap(), ["text chat-1 Nope."]);
}

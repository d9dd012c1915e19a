//! HTTP client for the remote command service.
//!
//! One `POST <service_host>/v1/chatbot` per invocation; the response body is
//! consumed as a byte stream and decoded incrementally.

use std::{error::Error as StdError, pin::Pin, time::Duration};

use {
    async_trait::async_trait,
    chatrelay_common::types::ReplyItem,
    chatrelay_config::ChatbotConfig,
    futures::{Stream, StreamExt},
    reqwest::Client,
    serde::Serialize,
    tracing::{debug, trace},
};

use crate::{
    decode::ReplyDecoder,
    error::{Context, Error, Result},
};

pub const API_VERSION: &str = "v1";
pub const RESOURCE: &str = "chatbot";

/// Longest slice of an error response body kept in a transport error.
const ERROR_BODY_EXCERPT: usize = 512;

/// Body of the outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub message: String,
    pub group_id: String,
    pub platform: String,
}

/// Replies in arrival order. Ends after the first error.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<ReplyItem>> + Send>>;

/// Something that turns an invocation request into a reply stream.
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Start the call. Fails with a transport error if no stream could be
    /// opened; later failures arrive through the stream itself.
    async fn open(&self, request: &InvocationRequest) -> Result<ReplyStream>;
}

/// Command service reached over HTTP.
pub struct HttpCommandService {
    client: Client,
    endpoint: String,
}

impl HttpCommandService {
    pub fn new(service_host: &str, config: &ChatbotConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("failed to build HTTP client for command service")?;

        Ok(Self {
            client,
            endpoint: endpoint_url(service_host),
        })
    }
}

/// `<host>/v1/chatbot`, tolerating trailing slashes on the host.
pub fn endpoint_url(service_host: &str) -> String {
    format!(
        "{}/{API_VERSION}/{RESOURCE}",
        service_host.trim().trim_end_matches('/')
    )
}

#[async_trait]
impl CommandService for HttpCommandService {
    async fn open(&self, request: &InvocationRequest) -> Result<ReplyStream> {
        debug!(endpoint = %self.endpoint, group_id = %request.group_id, "posting invocation");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                Error::transport_source(format!("POST {} failed", self.endpoint), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(Error::transport(format!(
                "command service returned HTTP {status}: {excerpt}"
            )));
        }

        Ok(decode_replies(response.bytes_stream()))
    }
}

/// Decode a stream of body chunks into replies as they complete.
pub fn decode_replies<S, B, E>(chunks: S) -> ReplyStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: StdError + Send + Sync + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = std::pin::pin!(chunks);
        let mut decoder = ReplyDecoder::new();

        loop {
            loop {
                match decoder.next_item() {
                    Ok(Some(item)) => {
                        trace!(index = decoder.decoded(), "decoded reply");
                        yield Ok(item);
                    },
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }

            match chunks.next().await {
                Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                Some(Err(e)) => {
                    yield Err(Error::transport_source("reply stream interrupted", e));
                    return;
                },
                None => break,
            }
        }

        if let Err(e) = decoder.finish() {
            yield Err(e);
        }
    })
}

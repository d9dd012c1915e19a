//! The invocation coordinator.
//!
//! An invocation runs the command filter, opens a reply stream and starts a
//! dispatch task for every decoded reply as soon as it arrives. It resolves
//! only after the stream has ended *and* every started dispatch has settled.
//! The first failure wins; dispatches already in flight are never cancelled.

use std::sync::Arc;

use {
    chatrelay_channels::ChannelOutbound,
    chatrelay_common::types::{InboundMessage, ReplyItem},
    chatrelay_config::ChatbotConfig,
    futures::StreamExt,
    tokio::{
        sync::Semaphore,
        task::{JoinError, JoinSet},
    },
};

use crate::{
    client::{CommandService, HttpCommandService, InvocationRequest, ReplyStream},
    dispatch::{ReplyDispatcher, ReplyHandler},
    error::{Error, Result},
    filter::{Classification, SkipReason, classify},
    observer::{InvocationEvent, InvocationObserver, TracingObserver},
};

/// How an invocation ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The message was not forwarded; one skipped reply was dispatched.
    Skipped(SkipReason),
    /// The service was called and every reply was delivered.
    Completed { replies: usize },
}

/// Routes command messages to the command service and their replies back.
pub struct Chatbot {
    platform: String,
    error_message: String,
    max_concurrent_replies: Option<usize>,
    service: Arc<dyn CommandService>,
    observer: Arc<dyn InvocationObserver>,
}

impl std::fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chatbot")
            .field("platform", &self.platform)
            .field("max_concurrent_replies", &self.max_concurrent_replies)
            .finish_non_exhaustive()
    }
}

fn require_service_host(config: &ChatbotConfig) -> Result<&str> {
    match config.service_host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => Ok(host),
        _ => Err(Error::config("missing service host for Chatbot")),
    }
}

impl Chatbot {
    /// Build a chatbot that talks to the configured service host over HTTP.
    pub fn new(config: &ChatbotConfig) -> Result<Self> {
        let host = require_service_host(config)?;
        let service = HttpCommandService::new(host, config)?;
        Self::with_service(config, Arc::new(service))
    }

    /// Build a chatbot on top of a custom command service.
    ///
    /// The configuration is validated the same way as in [`Chatbot::new`].
    pub fn with_service(config: &ChatbotConfig, service: Arc<dyn CommandService>) -> Result<Self> {
        require_service_host(config)?;
        if config.max_concurrent_replies == Some(0) {
            return Err(Error::config("max_concurrent_replies must be at least 1"));
        }

        Ok(Self {
            platform: config.platform.clone(),
            error_message: config.error_message.clone(),
            max_concurrent_replies: config.max_concurrent_replies,
            service,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// A dispatcher delivering to `chat_id`, sharing this chatbot's settings.
    pub fn dispatcher(
        &self,
        outbound: Arc<dyn ChannelOutbound>,
        chat_id: impl Into<String>,
    ) -> ReplyDispatcher {
        ReplyDispatcher::new(outbound, chat_id)
            .with_error_message(self.error_message.clone())
            .with_observer(Arc::clone(&self.observer))
    }

    /// Handle one inbound message end to end.
    pub async fn invoke(
        &self,
        message: &InboundMessage,
        handler: Arc<dyn ReplyHandler>,
    ) -> Result<InvocationOutcome> {
        if let Classification::Skip(reason) = classify(&message.body) {
            self.observer.on_event(&InvocationEvent::Skipped {
                reason,
                message: &message.body,
            });
            handler
                .handle(ReplyItem::skipped(reason.describe(&message.body)))
                .await?;
            return Ok(InvocationOutcome::Skipped(reason));
        }

        let request = InvocationRequest {
            message: message.body.clone(),
            group_id: message.conversation_id.clone(),
            platform: self.platform.clone(),
        };
        self.observer.on_event(&InvocationEvent::Forwarding {
            message: &request.message,
            group_id: &request.group_id,
            platform: &request.platform,
        });

        let result = match self.service.open(&request).await {
            Ok(stream) => self.drain(stream, handler).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(InvocationOutcome::Completed { replies }) => {
                self.observer
                    .on_event(&InvocationEvent::Completed { replies: *replies });
            },
            Ok(InvocationOutcome::Skipped(_)) => {},
            Err(error) => self.observer.on_event(&InvocationEvent::Failed { error }),
        }
        result
    }

    /// Read the stream to its end, forking a dispatch task per reply, then
    /// wait for every task.
    ///
    /// A failed dispatch does not stop the stream; only its end or a stream
    /// error does.
    async fn drain(
        &self,
        mut stream: ReplyStream,
        handler: Arc<dyn ReplyHandler>,
    ) -> Result<InvocationOutcome> {
        let limit = self.max_concurrent_replies.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        let mut failure: Option<Error> = None;
        let mut received = 0usize;

        loop {
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    self.record(&mut failure, flatten(joined));
                },
                next = stream.next() => match next {
                    Some(Ok(item)) => {
                        received += 1;
                        self.observer
                            .on_event(&InvocationEvent::ReplyReceived { index: received });
                        let permit = match limit.as_ref().map(Arc::clone) {
                            Some(semaphore) => match semaphore.acquire_owned().await {
                                Ok(permit) => Some(permit),
                                Err(closed) => {
                                    let e = chatrelay_channels::Error::external(
                                        "reply concurrency limit",
                                        closed,
                                    );
                                    self.record(&mut failure, Err(e.into()));
                                    break;
                                },
                            },
                            None => None,
                        };
                        let handler = Arc::clone(&handler);
                        tasks.spawn(async move {
                            let _permit = permit;
                            handler.handle(item).await
                        });
                    },
                    Some(Err(e)) => {
                        self.record(&mut failure, Err(e));
                        break;
                    },
                    None => break,
                },
            }
        }

        drop(stream);
        self.observer
            .on_event(&InvocationEvent::StreamClosed { replies: received });

        while let Some(joined) = tasks.join_next().await {
            self.record(&mut failure, flatten(joined));
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(InvocationOutcome::Completed { replies: received }),
        }
    }

    /// Keep the first failure; report later ones as discarded.
    fn record(&self, failure: &mut Option<Error>, result: Result<()>) {
        let Err(e) = result else {
            return;
        };
        match failure {
            None => *failure = Some(e),
            Some(_) => self
                .observer
                .on_event(&InvocationEvent::FailureDiscarded { error: &e }),
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(chatrelay_channels::Error::external("reply dispatch task", e).into()),
    }
}

//! Observability seam for the invocation pipeline.
//!
//! The pipeline never logs directly; it reports [`InvocationEvent`]s to an
//! injected [`InvocationObserver`]. [`TracingObserver`] is the default.

use tracing::{debug, info, warn};

use crate::{error::Error, filter::SkipReason};

/// Something noteworthy that happened during one invocation.
#[derive(Debug)]
pub enum InvocationEvent<'a> {
    /// The message was not forwarded.
    Skipped {
        reason: SkipReason,
        message: &'a str,
    },
    /// The command service is about to be called.
    Forwarding {
        message: &'a str,
        group_id: &'a str,
        platform: &'a str,
    },
    /// A reply was decoded and its dispatch started. `index` is 1-based.
    ReplyReceived { index: usize },
    /// A `skipped` reply reached the dispatcher.
    ReplySkipped { text: Option<&'a str> },
    /// An attachment had neither inline content nor a URL.
    EmptyAttachment { index: usize },
    /// The reply stream ended, cleanly or not.
    StreamClosed { replies: usize },
    /// A later failure was dropped because the invocation had already failed.
    FailureDiscarded { error: &'a Error },
    Completed { replies: usize },
    Failed { error: &'a Error },
}

pub trait InvocationObserver: Send + Sync {
    fn on_event(&self, event: &InvocationEvent<'_>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn on_event(&self, event: &InvocationEvent<'_>) {
        match event {
            InvocationEvent::Skipped { reason, message } => {
                info!(?reason, body = message, "skipping message");
            },
            InvocationEvent::Forwarding {
                message,
                group_id,
                platform,
            } => {
                info!(body = message, group_id, platform, "forwarding command");
            },
            InvocationEvent::ReplyReceived { index } => debug!(index, "reply received"),
            InvocationEvent::ReplySkipped { text } => {
                info!(text = text.unwrap_or_default(), "reply skipped");
            },
            InvocationEvent::EmptyAttachment { index } => {
                warn!(index, "attachment has neither content nor url, ignoring");
            },
            InvocationEvent::StreamClosed { replies } => debug!(replies, "reply stream closed"),
            InvocationEvent::FailureDiscarded { error } => {
                debug!(error = %error, "ignoring failure after invocation already failed");
            },
            InvocationEvent::Completed { replies } => info!(replies, "invocation completed"),
            InvocationEvent::Failed { error } => warn!(error = %error, "invocation failed"),
        }
    }
}

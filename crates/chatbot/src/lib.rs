//! Command gate and streaming invocation pipeline.
//!
//! Flow: inbound message → [`filter::classify`] → (forward) open a reply
//! stream on the command service → dispatch each decoded [`ReplyItem`] as its
//! own task → wait for the stream and every dispatch to settle.
//!
//! [`ReplyItem`]: chatrelay_common::types::ReplyItem

pub mod chatbot;
pub mod client;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod observer;

pub use {
    chatbot::{Chatbot, InvocationOutcome},
    client::{CommandService, HttpCommandService, InvocationRequest, ReplyStream},
    dispatch::{ReplyDispatcher, ReplyHandler},
    error::{Error, Result},
    filter::{Classification, SkipReason, classify},
    observer::{InvocationEvent, InvocationObserver, TracingObserver},
};

//! Channel plugin seam.
//!
//! Each messaging frontend (WhatsApp Web today) implements [`ChannelPlugin`]
//! and hands the chatbot a [`ChannelOutbound`] to deliver replies through.

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEvent, ChannelEventSink, ChannelOutbound, ChannelPlugin, ChannelType, LogEventSink,
    },
};

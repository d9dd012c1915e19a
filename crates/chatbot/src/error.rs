use std::error::Error as StdError;

use chatrelay_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chatbot cannot be built from the given configuration.
    #[error("invalid chatbot configuration: {message}")]
    Config { message: String },

    /// The command service could not be reached, refused the call, or the
    /// connection broke while streaming.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The reply stream contained data that is not a valid reply.
    #[error("malformed reply stream: {message}")]
    Decode { message: String },

    /// A reply could not be delivered to the channel.
    #[error("reply delivery failed: {0}")]
    Delivery(#[from] chatrelay_channels::Error),
}

impl Error {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn transport_source<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let context = context.into();
        Self::Transport {
            message: format!("{context}: {source}"),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

/// Context messages only arise while building the chatbot.
impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Config { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

chatrelay_common::impl_context!();

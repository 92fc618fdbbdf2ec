//! Outbound chat seam: the engine only ever talks to a [`ChatSink`].

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Error raised by a chat transport when an outbound send fails.
///
/// The engine never catches this: a failed send aborts the in-flight
/// handler, with no retry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not deliver the message.
    #[error("transport unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TransportError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        TransportError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the outbound half of the chat connection.
///
/// Implementations deliver `text` to `channel`; delivery is fire-and-forget
/// from the engine's perspective.
pub trait ChatSink: Send + Sync {
    /// Send `text` to `channel`.
    fn message<'a>(&'a self, channel: &'a str, text: &'a str) -> BoxFuture<'a, TransportResult<()>>;
}

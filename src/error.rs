//! Engine-level error composition.

use thiserror::Error;

use crate::{pool::DataError, transport::TransportError};

/// Errors surfaced by a game instance while handling an inbound event.
#[derive(Debug, Error)]
pub enum GameError {
    /// The game-definition source failed to load (startup or reload).
    #[error(transparent)]
    Data(#[from] DataError),
    /// An outbound send failed; the in-flight handler aborts, no retry.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

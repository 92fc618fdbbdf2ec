//! Library crate for scoutix, the channel-scoped trivia quiz bot engine.

pub mod access;
pub mod bot;
pub mod config;
pub mod error;
pub mod game;
pub mod pool;
pub mod registry;
pub mod timer;
pub mod transport;

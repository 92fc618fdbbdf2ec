//! Pluggable predicate deciding who may control a game.

/// Decides whether `sender` may issue game-control commands
/// (`start`, `stop`, `reload`) for a channel.
///
/// Denial is a silent no-op in the engine: no message, no state change.
pub trait AccessPolicy: Send + Sync {
    /// Whether `sender` is allowed to control the game.
    fn can_control(&self, sender: &str) -> bool;
}

/// Permissive placeholder policy: everyone is a controller.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_control(&self, _sender: &str) -> bool {
        true
    }
}

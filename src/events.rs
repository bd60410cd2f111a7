//! Callback surface the core reports through.
//!
//! The original design broadcast every mutation to a set of observers; here the
//! boards and the session are handed one sink at construction and invoke it
//! synchronously after each state-changing operation.

/// Which board an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player,
    System,
}

impl Side {
    pub fn is_player(&self) -> bool {
        matches!(self, Side::Player)
    }
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Side::Player => write!(f, "Player"),
            Side::System => write!(f, "System"),
        }
    }
}

/// Receiver for the events the core emits toward its driving layer.
///
/// All methods default to no-ops so a sink only implements what it cares about.
pub trait EventSink: Send + Sync {
    /// A board changed and should be re-read by the presentation layer.
    fn on_board_changed(&self, _side: Side) {}

    /// A log-worthy, human-readable event occurred.
    fn on_log_event(&self, _message: &str) {}

    /// The game ended. `summary` describes the final score.
    fn on_game_over(&self, _winner_is_player: bool, _summary: &str) {}
}

/// Sink that discards every event; useful for headless use and tests.
pub struct NullSink;

impl EventSink for NullSink {}

//! Conflict session status.

use serde::{Deserialize, Serialize};

/// The status of a conflict session.
///
/// Statuses advance only forward along the directed graph below; no
/// transition skips a state and none goes backward. `DraftA` is the sole
/// initial state, `Complete` the sole terminal state.
///
/// ```text
/// DraftA -> PendingB -> DraftB -> ReviewA -> ConfirmB -> Analyzing -> Complete
///                                                         ^      |
///                                                         +------+  (failed analysis, retryable)
/// ```
///
/// The derived `Ord` follows the graph order, which visibility rules and
/// monotonicity checks rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    /// Initiator is composing their account.
    DraftA,
    /// Waiting for the responder to begin.
    PendingB,
    /// Responder is composing their account.
    DraftB,
    /// Initiator is reviewing the responder's account and may add context.
    ReviewA,
    /// Responder is confirming the final context.
    ConfirmB,
    /// Both parties consented; either may trigger the external analysis.
    Analyzing,
    /// Terminal. Results are visible to both parties.
    Complete,
}

impl ConflictStatus {
    /// Returns true if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns the snake_case wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DraftA => "draft_a",
            Self::PendingB => "pending_b",
            Self::DraftB => "draft_b",
            Self::ReviewA => "review_a",
            Self::ConfirmB => "confirm_b",
            Self::Analyzing => "analyzing",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

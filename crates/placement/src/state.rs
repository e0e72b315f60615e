//! Placement state machine.

/// The state of one placement request in its lifecycle.
///
/// State transitions:
/// ```text
/// Validating ──► CheckingStock ──► Reserving ──► Committed
///                      │               │
///                      └───────────────┴──► RollingBack ──► Failed
///                                                       └─► Inconsistent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlacementState {
    /// Request shape is being checked. Nothing has been read or written.
    #[default]
    Validating,

    /// Stock levels are being read; still no writes.
    CheckingStock,

    /// Per-line writes are being applied.
    Reserving,

    /// A write failed and applied steps are being reversed.
    RollingBack,

    /// Every line committed (terminal state).
    Committed,

    /// Rollback fully reversed the applied steps (terminal state).
    Failed,

    /// Rollback itself failed; persisted state diverged (terminal state).
    Inconsistent,
}

impl PlacementState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementState::Validating => "Validating",
            PlacementState::CheckingStock => "CheckingStock",
            PlacementState::Reserving => "Reserving",
            PlacementState::RollingBack => "RollingBack",
            PlacementState::Committed => "Committed",
            PlacementState::Failed => "Failed",
            PlacementState::Inconsistent => "Inconsistent",
        }
    }
}

impl std::fmt::Display for PlacementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

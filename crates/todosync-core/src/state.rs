//! Session sync state.

/// Lifecycle of a coordinator session.
///
/// `Idle → Initializing → Syncing → Ready`; any failed bootstrap step
/// returns to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Initializing,
    Syncing,
    Ready,
}

impl SyncState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Syncing => "syncing",
            Self::Ready => "ready",
        }
    }
}

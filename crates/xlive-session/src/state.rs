//! Session lifecycle states.

use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Uninitialized ─► Created ─► Started ─► Ended
///                               ▲          │
///                               └──────────┘
/// ```
/// `Deleted` is reachable from every state and is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Allocated, not yet created.
    #[default]
    Uninitialized,
    /// Created; members may join.
    Created,
    /// Gameplay in progress.
    Started,
    /// Round finished; may start again.
    Ended,
    /// Torn down.
    Deleted,
}

impl SessionState {
    /// Lower-case name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Created => "created",
            Self::Started => "started",
            Self::Ended => "ended",
            Self::Deleted => "deleted",
        }
    }

    /// Whether `Start` is allowed.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Created | Self::Ended)
    }

    /// Whether host migration is allowed.
    pub fn can_migrate(self) -> bool {
        matches!(self, Self::Created | Self::Started)
    }

    /// Whether the session still accepts membership changes.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Created | Self::Started | Self::Ended)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

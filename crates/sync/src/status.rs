//! Aggregate synchronization status shown to the editing surface.

use serde::{Deserialize, Serialize};

/// The orchestrator's aggregate state.
///
/// - `Idle`    -- no pass has run yet (or nothing has been requested).
/// - `Syncing` -- a pass is in flight.
/// - `Synced`  -- the last pass pushed everything the server accepted.
/// - `Error`   -- the last pass hit a conflict or failure; local records
///   keep their pending edits until the embedder resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Error,
}

impl SyncStatus {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

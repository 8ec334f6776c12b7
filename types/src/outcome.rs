//! Result of recording a single view event.

use serde::{Deserialize, Serialize};

/// What happened to a view event.
///
/// A degraded write is represented explicitly so that callers can never mistake
/// "the exact count is unknown right now" for a real zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewOutcome {
    /// The view was counted in the fast store; carries the new absolute count.
    Counted(u64),
    /// The originator already viewed this item inside the dedup window; carries
    /// the current count, unchanged.
    Deduplicated(u64),
    /// The fast store was unreachable. The view landed in the durable catalog
    /// but no exact count is available.
    Degraded,
}

impl ViewOutcome {
    /// The count to show the caller, if one is known.
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Counted(n) | Self::Deduplicated(n) => Some(*n),
            Self::Degraded => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

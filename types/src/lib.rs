//! Fundamental types for the hotness engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! item and originator identifiers, ranking entries, increment outcomes, and the
//! clock abstraction used for dedup windows.

pub mod error;
pub mod item;
pub mod outcome;
pub mod ranking;
pub mod time;

pub use error::TypesError;
pub use item::{ItemId, OriginatorId};
pub use outcome::ViewOutcome;
pub use ranking::RankingEntry;
pub use time::{Clock, SystemClock, Timestamp};

use hotness_types::ItemId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HotnessError {
    #[error("config error: {0}")]
    Config(String),

    /// Neither the fast store nor the catalog accepted a write.
    #[error("view could not be recorded: {0}")]
    Unavailable(String),

    /// A degraded write targeted an item the catalog does not know.
    #[error("item {0} does not exist in the catalog")]
    UnknownItem(ItemId),

    #[error("engine not started")]
    NotStarted,

    /// The engine was stopped; build a new one to run again.
    #[error("engine already stopped")]
    Stopped,

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

//! Identifiers for catalog items and the originators of view events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Identifier of a catalog item whose views are tracked.
///
/// Always a positive integer; zero and negative values are rejected at the
/// boundary so the rest of the engine never sees an invalid id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ItemId(u64);

impl ItemId {
    pub fn new(raw: u64) -> Result<Self, TypesError> {
        if raw == 0 {
            return Err(TypesError::InvalidItemId(0));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Big-endian key encoding, so byte order matches numeric order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Result<Self, TypesError> {
        Self::new(u64::from_be_bytes(bytes))
    }
}

impl TryFrom<u64> for ItemId {
    type Error = TypesError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<i64> for ItemId {
    type Error = TypesError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        if raw <= 0 {
            return Err(TypesError::InvalidItemId(raw));
        }
        Ok(Self(raw as u64))
    }
}

impl From<ItemId> for u64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl FromStr for ItemId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| TypesError::UnparseableItemId(s.to_string()))?;
        Self::try_from(raw)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of whoever produced a view event (session, user, client).
///
/// Only used to build dedup markers; an empty originator means "do not dedup".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OriginatorId(String);

impl OriginatorId {
    /// Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OriginatorId {
    type Error = TypesError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(TypesError::BlankOriginator)
    }
}

impl From<OriginatorId> for String {
    fn from(id: OriginatorId) -> Self {
        id.0
    }
}

impl fmt::Display for OriginatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

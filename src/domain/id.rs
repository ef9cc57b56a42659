//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::time::now_nanos;

/// Durable correlation key of a recorded activity.
///
/// Text form is `"<timepoint>|<eid>"`. Parsing splits on the first `|` only, so the
/// external id may itself contain `|` (deposit ids do).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ActivityId {
    timepoint: u64,
    eid: String,
}

impl ActivityId {
    pub fn new(timepoint: u64, eid: impl Into<String>) -> Self {
        Self {
            timepoint,
            eid: eid.into(),
        }
    }

    /// Nanosecond timestamp taken when the external call returned.
    #[must_use]
    pub const fn timepoint(&self) -> u64 {
        self.timepoint
    }

    /// External result token (order id, transaction hash, ...).
    #[must_use]
    pub fn eid(&self) -> &str {
        &self.eid
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.timepoint, self.eid)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseActivityIdError {
    #[error("activity id '{0}' has no '|' separator")]
    MissingSeparator(String),

    #[error("activity id '{0}' has a non-numeric timepoint")]
    InvalidTimepoint(String),
}

impl FromStr for ActivityId {
    type Err = ParseActivityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (timepoint, eid) = s
            .split_once('|')
            .ok_or_else(|| ParseActivityIdError::MissingSeparator(s.to_string()))?;
        let timepoint = timepoint
            .parse::<u64>()
            .map_err(|_| ParseActivityIdError::InvalidTimepoint(s.to_string()))?;
        Ok(Self::new(timepoint, eid))
    }
}

impl From<ActivityId> for String {
    fn from(id: ActivityId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ActivityId {
    type Error = ParseActivityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Local handle reserved before an external call is dispatched.
///
/// The durable [`ActivityId`] only exists once the exchange or chain has answered;
/// the token lets logs and the stored params tie a crashed attempt back to its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptToken {
    token: Uuid,
    reserved_at: u64,
}

impl AttemptToken {
    /// Reserve a fresh token.
    #[must_use]
    pub fn reserve() -> Self {
        Self {
            token: Uuid::new_v4(),
            reserved_at: now_nanos(),
        }
    }

    /// Nanosecond timestamp of the reservation.
    #[must_use]
    pub const fn reserved_at(&self) -> u64 {
        self.reserved_at
    }

    /// Build the durable id from the external result token.
    #[must_use]
    pub fn finalize(self, eid: impl Into<String>) -> ActivityId {
        ActivityId::new(now_nanos(), eid)
    }
}

impl fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// Exchange identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExchangeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Asset identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Exchange order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

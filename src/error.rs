use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::id::ActivityId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Sanity-check failures. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("notional {notional} is below the pair minimum {min_notional}")]
    NotionalTooSmall {
        notional: Decimal,
        min_notional: Decimal,
    },

    #[error("amount {amount} of {asset} is below the withdraw fee floor {floor}")]
    BelowWithdrawFloor {
        asset: String,
        amount: String,
        floor: String,
    },

    #[error("buy rate can not be zero (index {index})")]
    ZeroBuyRate { index: usize },

    #[error("rates at index {index} are inconsistent: buy {buy}, sell {sell}, afp mid {afp_mid}")]
    InconsistentRates {
        index: usize,
        buy: f64,
        sell: f64,
        afp_mid: f64,
    },

    #[error("assets, buys, sells and afp mids must have the same length")]
    LengthMismatch,

    #[error("activity {id} is a {action} activity, expected {expected}")]
    WrongAction {
        id: String,
        action: String,
        expected: &'static str,
    },

    #[error("activity {id} is missing param '{param}'")]
    MissingParam { id: String, param: &'static str },

    #[error("activity {id} moved {recorded}, not {given}")]
    AssetMismatch {
        id: String,
        recorded: String,
        given: String,
    },

    #[error("no pending set_rates transaction at or above nonce {nonce}")]
    NothingToCancel { nonce: u64 },
}

/// Failures of the activity ledger backing store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("ledger write failed: {0}")]
    Write(String),

    #[error("ledger read failed: {0}")]
    Read(String),
}

/// A domain failure that happened together with a failed ledger write.
///
/// Neither cause is dropped; both stay inspectable.
#[derive(Error, Debug)]
#[error("{domain}; additionally the activity could not be recorded: {storage}")]
pub struct CombinedError {
    domain: Error,
    storage: StorageError,
}

impl CombinedError {
    /// The business-level failure.
    #[must_use]
    pub fn domain(&self) -> &Error {
        &self.domain
    }

    /// The ledger failure.
    #[must_use]
    pub fn storage(&self) -> &StorageError {
        &self.storage
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{target} call failed: {reason}")]
    ExternalCall { target: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Combined(Box<CombinedError>),
}

impl Error {
    /// Shorthand for an exchange or chain call failure.
    pub fn external(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::ExternalCall {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the validation failure, looking through a combined error.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Combined(c) => c.domain().as_validation(),
            _ => None,
        }
    }

    /// Returns the combined error, if both a domain and a storage failure occurred.
    #[must_use]
    pub fn as_combined(&self) -> Option<&CombinedError> {
        match self {
            Self::Combined(c) => Some(c),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Merge a domain outcome with the outcome of the ledger write that followed it.
///
/// `(None, None)` is success, a single failure passes through unchanged, and two
/// failures become [`Error::Combined`].
#[must_use]
pub fn combine(domain: Option<Error>, storage: Option<StorageError>) -> Option<Error> {
    match (domain, storage) {
        (None, None) => None,
        (Some(domain), None) => Some(domain),
        (None, Some(storage)) => Some(Error::Storage(storage)),
        (Some(domain), Some(storage)) => {
            Some(Error::Combined(Box::new(CombinedError { domain, storage })))
        }
    }
}

/// An orchestrator failure that still carries the recorded activity's id.
///
/// The id is a correlation handle: the attempt was recorded even though it failed.
#[derive(Error, Debug)]
#[error("activity {id}: {error}")]
pub struct ActionError {
    pub id: ActivityId,
    #[source]
    pub error: Error,
}

impl ActionError {
    pub fn new(id: ActivityId, error: Error) -> Self {
        Self { id, error }
    }
}

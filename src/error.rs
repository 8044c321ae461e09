use thiserror::Error;

/// An [`Options`](crate::options::Options) field failed its validity check.
///
/// Constructing a [`Snowflake`](crate::engine::Snowflake) or
/// [`ShardedGenerator`](crate::sharded::ShardedGenerator) with invalid options
/// returns this error; [`install`](crate::install) panics on it, matching the
/// reference behaviour (`panic(err)` in the upstream `NewDefaultIdGenerator`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("BaseTime out of range [2025-01-01T00:00:00Z, now], got {0}")]
    BaseTime(i64),

    #[error("WorkerIdBitLength out of range [1, 19] or 'f', got {0}")]
    WorkerIdBitLength(u8),

    #[error("WorkerIdBitLength + SeqBitLength must be <= 22, got {0}")]
    BitLengthSum(u8),

    #[error("WorkerId out of range [0, {max}], got {got}")]
    WorkerId { got: i64, max: i64 },

    #[error("SeqBitLength out of range [3, 22], got {0}")]
    SeqBitLength(u8),

    #[error("MaxSeqNumber out of range [{min}, {max}], got {got}")]
    MaxSeqNumber { got: u32, min: u32, max: u32 },

    #[error("MinSeqNumber out of range [5, {max}], got {got}")]
    MinSeqNumber { got: u32, max: u32 },

    #[error("TopOverCostCount out of range [0, 10000], got {0}")]
    TopOverCostCount(u32),
}

/// Textual-codec decode failure (spec §6.3 / §7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input string is empty")]
    Empty,
    #[error("invalid character: {0:?}")]
    InvalidChar(char),
    #[error("value overflows a signed 64-bit integer")]
    Overflow,
}

/// Failure surfaced from an external worker-id coordinator during
/// [`install_with_coordinator`](crate::coordinator::install_with_coordinator).
///
/// This never originates inside the core engine: `next()` cannot fail (spec
/// §4.1, §7). It is only returned from the opt-in coordinator installation
/// path.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to acquire a worker id: {0}")]
    AcquireFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("worker id options were rejected: {0}")]
    Options(#[from] OptionsError),
}

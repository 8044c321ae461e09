//! `zid`: a distributed monotonic identifier generator.
//!
//! Issues 63-bit integers unique across a fleet of cooperating nodes by
//! packing the wall-clock instant of issuance and the identity of the
//! issuing node into the integer itself. The crate's core is a single-node
//! state machine (see [`engine`]) that handles clock reversal and sequence
//! exhaustion ("overcost drift") while preserving uniqueness under
//! concurrent callers; a [`sharded`] driver partitions contention across
//! many such engines behind one facade.
//!
//! ```
//! let id = zid::next();
//! assert_eq!(zid::extract_worker_id(id), 0);
//! ```
//!
//! Worker-id coordination across a fleet, signal handling, and
//! configuration loading are out of scope for this crate (see
//! [`coordinator`] for the one interface boundary this crate does define).

pub mod codec;
pub mod coordinator;
pub mod driver;
pub mod engine;
pub mod error;
pub mod options;
pub mod sharded;

use std::sync::{OnceLock, RwLock};

pub use driver::IdGenerator;
pub use engine::Snowflake;
pub use error::{CoordinatorError, DecodeError, OptionsError};
pub use options::{Options, OptionsBuilder, ResolvedOptions, WorkerIdBitLength};
pub use sharded::ShardedGenerator;

/// Process-wide installed generator. Set on first use with defaults, or
/// replaced via [`install`]/[`try_install`]. Guarded by an [`RwLock`] rather
/// than swapped behind a single atomic pointer: readers clone the `Arc`
/// under the lock and then call through it without holding the lock, so a
/// replacement never blocks or retroactively affects a call already in
/// flight (spec §5 "Process-wide state").
static GENERATOR: OnceLock<RwLock<std::sync::Arc<dyn IdGenerator>>> = OnceLock::new();

/// Serializes tests (in this crate's own test suite, across modules) that
/// call `install`/`try_install`/`install_with_coordinator`, since the
/// installed generator is process-wide and cargo runs a crate's tests
/// concurrently within one process.
#[cfg(test)]
pub(crate) static INSTALL_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn generator() -> std::sync::Arc<dyn IdGenerator> {
    let lock = GENERATOR.get_or_init(|| {
        RwLock::new(build(Options::default()).expect("default options are always valid"))
    });
    lock.read().expect("generator lock poisoned").clone()
}

fn build(options: Options) -> Result<std::sync::Arc<dyn IdGenerator>, OptionsError> {
    if options.sharded_mode {
        Ok(std::sync::Arc::new(ShardedGenerator::new(options)?))
    } else {
        Ok(std::sync::Arc::new(Snowflake::new(options)?))
    }
}

/// Installs `options` as the process-wide generator, replacing whatever was
/// installed before. Panics if `options` fails validation — matching the
/// upstream reference's `panic(err)` in `NewDefaultIdGenerator`/
/// `WithOptions`. Use [`try_install`] for a non-panicking path.
///
/// Idempotent: calling this again with new options atomically replaces the
/// installed generator; callers already mid-call against the previous one
/// are unaffected (spec §5, §9).
pub fn install(options: Options) {
    try_install(options).expect("invalid zid options");
}

/// As [`install`], but returns the validation error instead of panicking.
pub fn try_install(options: Options) -> Result<(), OptionsError> {
    let sharded_mode = options.sharded_mode;
    let built = build(options)?;
    let lock = GENERATOR.get_or_init(|| RwLock::new(built.clone()));
    *lock.write().expect("generator lock poisoned") = built;
    tracing::info!(sharded_mode, "installed zid generator");
    Ok(())
}

/// Issues a freshly generated id from the process-wide generator (decimal
/// domain; see [`next_hex`]/[`next_base36`]/[`next_base62`] for the other
/// encodings).
pub fn next() -> i64 {
    generator().next_id()
}

/// `next()` rendered as a lowercase hex string.
pub fn next_hex() -> String {
    codec::to_hex(next())
}

/// `next()` rendered as a lowercase base-36 string.
pub fn next_base36() -> String {
    codec::to_base36(next())
}

/// `next()` rendered as a base-62 string.
pub fn next_base62() -> String {
    codec::to_base62(next())
}

/// The wall-clock instant (ms since Unix epoch) an id was issued at.
pub fn extract_time(id: i64) -> i64 {
    generator().extract_time(id)
}

/// As [`extract_time`], parsing a hex-encoded id. Invalid input yields `0`.
pub fn extract_time_hex(hex: &str) -> i64 {
    i64::from_str_radix(hex, 16)
        .map(extract_time)
        .unwrap_or(0)
}

/// As [`extract_time`], parsing a base-36-encoded id. Invalid input yields `0`.
pub fn extract_time_base36(base36: &str) -> i64 {
    i64::from_str_radix(base36, 36)
        .map(extract_time)
        .unwrap_or(0)
}

/// As [`extract_time`], parsing a base-62-encoded id. Invalid input yields `0`.
pub fn extract_time_base62(base62: &str) -> i64 {
    codec::from_base62(base62).map(extract_time).unwrap_or(0)
}

/// The worker id an id was issued with.
pub fn extract_worker_id(id: i64) -> i64 {
    generator().extract_worker_id(id)
}

/// As [`extract_worker_id`], parsing a hex-encoded id. Invalid input yields `0`.
pub fn extract_worker_id_hex(hex: &str) -> i64 {
    i64::from_str_radix(hex, 16)
        .map(extract_worker_id)
        .unwrap_or(0)
}

/// As [`extract_worker_id`], parsing a base-36-encoded id. Invalid input yields `0`.
pub fn extract_worker_id_base36(base36: &str) -> i64 {
    i64::from_str_radix(base36, 36)
        .map(extract_worker_id)
        .unwrap_or(0)
}

/// As [`extract_worker_id`], parsing a base-62-encoded id. Invalid input yields `0`.
pub fn extract_worker_id_base62(base62: &str) -> i64 {
    codec::from_base62(base62)
        .map(extract_worker_id)
        .unwrap_or(0)
}

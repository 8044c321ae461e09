//! Bit-layout configuration: validates raw options and derives the masks,
//! ceilings, and shifts the engine packs ids with.
//!
//! Grounded in `examples/original_source/options.go` (`Options.Validate`).

use chrono::{TimeZone, Utc};

use crate::error::OptionsError;

/// Milliseconds since the Unix epoch for 2025-01-01T00:00:00Z — the floor for
/// `BaseTime`.
const BASE_TIME_FLOOR_MS: i64 = 1_735_689_600_000;

/// Default `BaseTime`: 2025-10-01T00:00:00Z.
fn default_base_time_ms() -> i64 {
    Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0)
        .single()
        .expect("2025-10-01T00:00:00Z is a valid instant")
        .timestamp_millis()
}

/// How the `WorkerIdBitLength` option was supplied.
///
/// The upstream Go source overloads a `byte` field: `0` means "apply the
/// default", and the ASCII character `'f'` is a sentinel meaning "disable the
/// worker-id field entirely" (spec §3.2). Rust expresses that overload as a
/// tagged enum instead of reusing the byte for two unrelated meanings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerIdBitLength {
    /// Apply the default (4 bits).
    #[default]
    Auto,
    /// Use exactly this many bits, `1..=19`.
    Bits(u8),
    /// The `'f'` sentinel: force `W = 0`, `WorkerId = 0`, `ShardedMode = false`.
    Disabled,
}

/// Raw, caller-supplied configuration. Validate with [`Options::validate`]
/// before use; the validated form is consumed internally by
/// [`Snowflake::new`](crate::engine::Snowflake::new) and
/// [`ShardedGenerator::new`](crate::sharded::ShardedGenerator::new).
#[derive(Debug, Clone)]
pub struct Options {
    /// Milliseconds since Unix epoch. `0` selects the default
    /// (2025-10-01T00:00:00Z).
    pub base_time: i64,
    /// Value packed into the worker-id field. Ignored when `sharded_mode` is
    /// set (each shard gets its own worker id).
    pub worker_id: i64,
    /// Bit width of the worker-id field.
    pub worker_id_bit_length: WorkerIdBitLength,
    /// Bit width of the sequence field. `0` selects the default (6).
    pub seq_bit_length: u8,
    /// Upper bound on the sequence field for a given tick. `0` selects the
    /// maximum representable value for `seq_bit_length`.
    pub max_seq_number: u32,
    /// Lower bound on the sequence field; values below this are reserved for
    /// turn-back handling (spec §4.1). `0` selects the default (5).
    pub min_seq_number: u32,
    /// Max consecutive drift ticks before forced re-sync to the wall clock.
    /// `0` selects the default (2000).
    pub top_over_cost_count: u32,
    /// If set, `worker_id` is ignored and the sharded driver enumerates one
    /// worker id per shard.
    pub sharded_mode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            base_time: 0,
            worker_id: 0,
            worker_id_bit_length: WorkerIdBitLength::Auto,
            seq_bit_length: 0,
            max_seq_number: 0,
            min_seq_number: 0,
            top_over_cost_count: 0,
            sharded_mode: false,
        }
    }
}

/// Fully resolved, validated options: every sentinel has been replaced by its
/// default and every derived quantity (`timestamp_shift`, `max_worker_id`,
/// `max_seq`) has been computed once.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOptions {
    pub base_time: i64,
    pub worker_id: i64,
    pub worker_id_bit_length: u8,
    pub seq_bit_length: u8,
    pub max_seq_number: u32,
    pub min_seq_number: u32,
    pub top_over_cost_count: u32,
    pub sharded_mode: bool,
    pub timestamp_shift: u8,
}

impl ResolvedOptions {
    /// `2^W - 1`: the largest worker id this layout can represent, and (in
    /// sharded mode) `N - 1` shards.
    pub fn max_worker_id(&self) -> i64 {
        (1i64 << self.worker_id_bit_length) - 1
    }

    /// `2^W`: the number of independent engines a sharded driver built from
    /// these options holds.
    pub fn max_worker_id_number(&self) -> i64 {
        1i64 << self.worker_id_bit_length
    }

    /// `2^S - 1`: the largest sequence value this layout can represent.
    pub fn max_seq(&self) -> u32 {
        (1u32 << self.seq_bit_length) - 1
    }
}

impl Options {
    /// Applies defaults ("first non-zero wins"), resolves the
    /// `WorkerIdBitLength` sentinel, and enforces every constraint in spec
    /// §3.2, returning the first violation found.
    pub fn validate(mut self) -> Result<ResolvedOptions, OptionsError> {
        let disabled = self.worker_id_bit_length == WorkerIdBitLength::Disabled;
        if disabled {
            self.worker_id = 0;
            self.sharded_mode = false;
        }

        let base_time_floor = BASE_TIME_FLOOR_MS;
        if self.base_time == 0 {
            self.base_time = default_base_time_ms();
        }
        let now = Utc::now().timestamp_millis();
        if self.base_time < base_time_floor || self.base_time > now {
            return Err(OptionsError::BaseTime(self.base_time));
        }

        // `Bits(0)` and `Auto` resolve the same way: the upstream "first
        // non-zero wins" default rule can never observe a literal zero
        // (only the `'f'` sentinel drives W to zero, via `disabled` above).
        let worker_id_bit_length: u8 = if disabled {
            0
        } else {
            match self.worker_id_bit_length {
                WorkerIdBitLength::Auto => 4,
                WorkerIdBitLength::Bits(0) => 4,
                WorkerIdBitLength::Bits(w) => w,
                WorkerIdBitLength::Disabled => unreachable!("handled above"),
            }
        };
        // `W == 0` is only ever reached via the `Disabled` sentinel handled
        // above; guard the lower bound explicitly anyway so this stays
        // correct even if `Bits(0)` stops being remapped to the default in
        // the future.
        if !disabled && !(1..=19).contains(&worker_id_bit_length) {
            return Err(OptionsError::WorkerIdBitLength(worker_id_bit_length));
        }

        let seq_bit_length = if self.seq_bit_length == 0 {
            6
        } else {
            self.seq_bit_length
        };
        if !(3..=22).contains(&seq_bit_length) {
            return Err(OptionsError::SeqBitLength(seq_bit_length));
        }

        if worker_id_bit_length + seq_bit_length > 22 {
            return Err(OptionsError::BitLengthSum(
                worker_id_bit_length + seq_bit_length,
            ));
        }

        let max_worker_id = (1i64 << worker_id_bit_length) - 1;
        if self.worker_id < 0 || self.worker_id > max_worker_id {
            return Err(OptionsError::WorkerId {
                got: self.worker_id,
                max: max_worker_id,
            });
        }

        // MinSeqNumber's own default must be resolved before MaxSeqNumber's
        // lower bound can be checked against it, and vice versa (spec §3.2:
        // MaxSeqNumber in [MinSeqNumber, MaxSeq], MinSeqNumber in [5,
        // MaxSeqNumber]) — resolve both sentinels first, then validate each
        // against the other's resolved value.
        let max_seq = (1u32 << seq_bit_length) - 1;
        let min_seq_number = if self.min_seq_number == 0 {
            5
        } else {
            self.min_seq_number
        };
        let max_seq_number = if self.max_seq_number == 0 {
            max_seq
        } else {
            self.max_seq_number
        };
        if max_seq_number < min_seq_number || max_seq_number > max_seq {
            return Err(OptionsError::MaxSeqNumber {
                got: max_seq_number,
                min: min_seq_number,
                max: max_seq,
            });
        }
        if !(5..=max_seq_number).contains(&min_seq_number) {
            return Err(OptionsError::MinSeqNumber {
                got: min_seq_number,
                max: max_seq_number,
            });
        }

        let top_over_cost_count = if self.top_over_cost_count == 0 {
            2000
        } else {
            self.top_over_cost_count
        };
        if top_over_cost_count > 10000 {
            return Err(OptionsError::TopOverCostCount(top_over_cost_count));
        }

        Ok(ResolvedOptions {
            base_time: self.base_time,
            worker_id: self.worker_id,
            worker_id_bit_length,
            seq_bit_length,
            max_seq_number,
            min_seq_number,
            top_over_cost_count,
            sharded_mode: self.sharded_mode,
            timestamp_shift: worker_id_bit_length + seq_bit_length,
        })
    }

    /// A chainable builder, mirroring the construction style used elsewhere
    /// in the retrieval pack (e.g. `idbuilder-idbuilder-rust`'s config
    /// builder) instead of a bare struct literal.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

/// Chainable builder over [`Options`]. Configuration loading (env vars,
/// files) stays out of scope (spec §1); this only removes the need to
/// hand-construct a raw struct literal.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    pub fn base_time(mut self, ms_since_epoch: i64) -> Self {
        self.0.base_time = ms_since_epoch;
        self
    }

    pub fn worker_id(mut self, worker_id: i64) -> Self {
        self.0.worker_id = worker_id;
        self
    }

    pub fn worker_id_bit_length(mut self, bits: u8) -> Self {
        self.0.worker_id_bit_length = WorkerIdBitLength::Bits(bits);
        self
    }

    /// The `'f'` sentinel: disables the worker-id field entirely.
    pub fn disable_worker_id(mut self) -> Self {
        self.0.worker_id_bit_length = WorkerIdBitLength::Disabled;
        self
    }

    pub fn seq_bit_length(mut self, bits: u8) -> Self {
        self.0.seq_bit_length = bits;
        self
    }

    pub fn max_seq_number(mut self, max: u32) -> Self {
        self.0.max_seq_number = max;
        self
    }

    pub fn min_seq_number(mut self, min: u32) -> Self {
        self.0.min_seq_number = min;
        self
    }

    pub fn top_over_cost_count(mut self, count: u32) -> Self {
        self.0.top_over_cost_count = count;
        self
    }

    pub fn sharded_mode(mut self, sharded: bool) -> Self {
        self.0.sharded_mode = sharded;
        self
    }

    pub fn build(self) -> Options {
        self.0
    }

    pub fn validate(self) -> Result<ResolvedOptions, OptionsError> {
        self.0.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let resolved = Options::default().validate().unwrap();
        assert_eq!(resolved.worker_id_bit_length, 4);
        assert_eq!(resolved.seq_bit_length, 6);
        assert_eq!(resolved.min_seq_number, 5);
        assert_eq!(resolved.top_over_cost_count, 2000);
        assert_eq!(resolved.base_time, default_base_time_ms());
    }

    #[test]
    fn zero_worker_bits_falls_back_to_default_then_seq_still_rejected() {
        // A literal 0 for WorkerIdBitLength can never survive the "first
        // non-zero wins" default rule (only the 'f' sentinel reaches W=0),
        // so this fails on the independently-invalid SeqBitLength instead.
        let err = Options::builder()
            .worker_id_bit_length(0)
            .seq_bit_length(2)
            .build()
            .validate()
            .unwrap_err();
        assert_eq!(err, OptionsError::SeqBitLength(2));
    }

    #[test]
    fn rejects_bit_length_sum_over_22() {
        let err = Options::builder()
            .worker_id_bit_length(12)
            .seq_bit_length(12)
            .build()
            .validate()
            .unwrap_err();
        assert_eq!(err, OptionsError::BitLengthSum(24));
    }

    #[test]
    fn disable_worker_id_forces_zero() {
        let resolved = Options::builder()
            .disable_worker_id()
            .worker_id(7)
            .sharded_mode(true)
            .build()
            .validate()
            .unwrap();
        assert_eq!(resolved.worker_id_bit_length, 0);
        assert_eq!(resolved.worker_id, 0);
        assert!(!resolved.sharded_mode);
    }

    #[test]
    fn max_seq_number_zero_sentinel_uses_ceiling() {
        let resolved = Options::builder().seq_bit_length(6).build().validate().unwrap();
        assert_eq!(resolved.max_seq_number, 63);
    }

    #[test]
    fn base_time_too_early_rejected() {
        let err = Options::builder()
            .base_time(1_000_000_000_000)
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, OptionsError::BaseTime(_)));
    }
}

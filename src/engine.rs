//! The snowflake state machine: the single-node component that produces the
//! next identifier under lock, handling clock reversal and sequence
//! exhaustion ("overcost drift").
//!
//! Grounded in `examples/original_source/snowflake.go`
//! (`NextNormalId`/`NextOverCostId`/`CalcId`/`CalcTurnBackId`), following the
//! mutex-per-engine shape of the teacher's `generator.rs`
//! (`idana-the-app-snowflake-id-rs`).

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::error::OptionsError;
use crate::options::{Options, ResolvedOptions};

/// Mutable state guarded by the engine's single mutex (spec §3.3).
struct State {
    last_time_tick: i64,
    current_seq: u32,
    is_over_cost: bool,
    over_cost_count_in_one_term: u32,
    turn_back_time_tick: i64,
    turn_back_index: u8,
}

/// A single-node snowflake id generator.
///
/// Every mutable field lives behind one [`Mutex`]; the entire body of
/// [`next`](Snowflake::next) — including the wall-clock read and the rare
/// busy-wait in [`next_tick`](Snowflake::next_tick) — executes while that
/// mutex is held (spec §5). Construction is the only place this type can
/// fail; `next()` itself never errors.
pub struct Snowflake {
    opts: ResolvedOptions,
    state: Mutex<State>,
}

impl Snowflake {
    /// Validates `options` and builds a new engine. Returns
    /// [`OptionsError`] on the first violated constraint (spec §3.2, §4.4).
    pub fn new(options: Options) -> Result<Self, OptionsError> {
        let opts = options.validate()?;
        Ok(Self::from_resolved(opts))
    }

    pub(crate) fn from_resolved(opts: ResolvedOptions) -> Self {
        Snowflake {
            opts,
            state: Mutex::new(State {
                last_time_tick: 0,
                current_seq: opts.min_seq_number,
                is_over_cost: false,
                over_cost_count_in_one_term: 0,
                turn_back_time_tick: 0,
                turn_back_index: 0,
            }),
        }
    }

    /// The resolved bit layout backing this engine.
    pub fn options(&self) -> &ResolvedOptions {
        &self.opts
    }

    /// Returns a freshly issued identifier. Blocks only for mutex
    /// acquisition and, in the rare drift-exhaustion case, a bounded
    /// busy-wait for the next millisecond (spec §4.1).
    pub fn next(&self) -> i64 {
        let mut state = self.state.lock().expect("snowflake mutex poisoned");
        if state.is_over_cost {
            self.next_over_cost_id(&mut state)
        } else {
            self.next_normal_id(&mut state)
        }
    }

    /// `(id >> timestampShift) + BaseTime`: the wall-clock instant (ms since
    /// Unix epoch) this id was packed with. Pure.
    pub fn extract_time(&self, id: i64) -> i64 {
        (id >> self.opts.timestamp_shift) + self.opts.base_time
    }

    /// `(id >> S) & MaxWorkerId`: the worker id this id was packed with.
    /// Pure.
    pub fn extract_worker(&self, id: i64) -> i64 {
        let mask = (1i64 << self.opts.worker_id_bit_length) - 1;
        (id >> self.opts.seq_bit_length) & mask
    }

    fn current_time_tick(&self) -> i64 {
        Utc::now().timestamp_millis() - self.opts.base_time
    }

    /// Busy-waits in 1ms increments until the wall clock exceeds
    /// `last_time_tick`. Runs under the engine's exclusive lock by design
    /// (spec §5): the drift-exhaustion case is rare enough that releasing
    /// the lock to sleep would only complicate the state invariant.
    fn next_tick(&self, last_time_tick: i64) -> i64 {
        let mut tick = self.current_time_tick();
        while tick <= last_time_tick {
            std::thread::sleep(Duration::from_millis(1));
            tick = self.current_time_tick();
        }
        tick
    }

    fn pack(&self, tick: i64, seq: u32) -> i64 {
        (tick << self.opts.timestamp_shift)
            | (self.opts.worker_id << self.opts.seq_bit_length)
            | (seq as i64)
    }

    fn next_normal_id(&self, state: &mut State) -> i64 {
        let now = self.current_time_tick();

        if now < state.last_time_tick {
            if state.turn_back_time_tick < 1 {
                state.turn_back_time_tick = state.last_time_tick - 1;
                state.turn_back_index += 1;
                if state.turn_back_index > 4 {
                    state.turn_back_index = 1;
                }
                tracing::trace!(
                    turn_back_index = state.turn_back_index,
                    turn_back_tick = state.turn_back_time_tick,
                    "clock moved backwards, entering turn-back term"
                );
            }
            let id = self.pack(state.turn_back_time_tick, state.turn_back_index as u32);
            state.turn_back_time_tick -= 1;
            return id;
        }

        if state.turn_back_time_tick > 0 {
            state.turn_back_time_tick = 0;
        }

        if now > state.last_time_tick {
            state.last_time_tick = now;
            state.current_seq = self.opts.min_seq_number;
            let id = self.pack(state.last_time_tick, state.current_seq);
            state.current_seq += 1;
            return id;
        }

        if state.current_seq > self.opts.max_seq_number {
            state.last_time_tick += 1;
            state.current_seq = self.opts.min_seq_number;
            state.is_over_cost = true;
            state.over_cost_count_in_one_term = 1;
            tracing::trace!(tick = state.last_time_tick, "sequence exhausted, entering overcost drift");
            let id = self.pack(state.last_time_tick, state.current_seq);
            state.current_seq += 1;
            return id;
        }

        let id = self.pack(state.last_time_tick, state.current_seq);
        state.current_seq += 1;
        id
    }

    fn next_over_cost_id(&self, state: &mut State) -> i64 {
        let now = self.current_time_tick();

        if now > state.last_time_tick {
            state.last_time_tick = now;
            state.current_seq = self.opts.min_seq_number;
            state.is_over_cost = false;
            state.over_cost_count_in_one_term = 0;
            tracing::trace!(tick = now, "wall clock caught up, leaving overcost drift");
            let id = self.pack(state.last_time_tick, state.current_seq);
            state.current_seq += 1;
            return id;
        }

        if state.over_cost_count_in_one_term >= self.opts.top_over_cost_count {
            let tick = self.next_tick(state.last_time_tick);
            state.last_time_tick = tick;
            state.current_seq = self.opts.min_seq_number;
            state.is_over_cost = false;
            state.over_cost_count_in_one_term = 0;
            let id = self.pack(state.last_time_tick, state.current_seq);
            state.current_seq += 1;
            return id;
        }

        if state.current_seq > self.opts.max_seq_number {
            state.last_time_tick += 1;
            state.current_seq = self.opts.min_seq_number;
            state.over_cost_count_in_one_term += 1;
            let id = self.pack(state.last_time_tick, state.current_seq);
            state.current_seq += 1;
            return id;
        }

        let id = self.pack(state.last_time_tick, state.current_seq);
        state.current_seq += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn engine(worker_id: i64) -> Snowflake {
        Snowflake::new(
            Options::builder()
                .worker_id(worker_id)
                .worker_id_bit_length(4)
                .seq_bit_length(6)
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn ids_are_strictly_increasing_within_a_tick() {
        let sw = engine(1);
        let a = sw.next();
        let b = sw.next();
        assert!(b > a);
    }

    #[test]
    fn extract_worker_round_trips() {
        let sw = engine(9);
        for _ in 0..10 {
            let id = sw.next();
            assert_eq!(sw.extract_worker(id), 9);
        }
    }

    #[test]
    fn extract_time_is_close_to_now() {
        let sw = engine(1);
        let before = Utc::now().timestamp_millis();
        let id = sw.next();
        let after = Utc::now().timestamp_millis();
        let t = sw.extract_time(id);
        assert!(t >= before - 5 && t <= after + 5);
    }

    #[test]
    fn sequence_exhaustion_enters_overcost_and_stays_distinct() {
        // Installs a subscriber so the overcost/turn-back trace! events this
        // test triggers actually go somewhere instead of being dropped by
        // the default no-op subscriber.
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("trace")
            .try_init();

        // seq bits = 3 => max seq 7, min seq 5: only seq 5,6,7 available per
        // tick, so three calls force overcost on the fourth.
        let sw = Snowflake::new(
            Options::builder()
                .worker_id(0)
                .worker_id_bit_length(4)
                .seq_bit_length(3)
                .min_seq_number(5)
                .build(),
        )
        .unwrap();

        let mut ids = HashSet::new();
        for _ in 0..50 {
            assert!(ids.insert(sw.next()));
        }
    }

    #[test]
    fn concurrent_callers_produce_unique_ids() {
        let sw = Arc::new(engine(3));
        let mut ids = HashSet::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let sw = Arc::clone(&sw);
                    scope.spawn(move || {
                        (0..2000).map(|_| sw.next()).collect::<Vec<_>>()
                    })
                })
                .collect();
            for h in handles {
                for id in h.join().unwrap() {
                    assert!(ids.insert(id), "duplicate id {id}");
                }
            }
        });
        assert_eq!(ids.len(), 16 * 2000);
    }

    #[test]
    fn clock_reversal_uses_reserved_slots() {
        let sw = engine(1);
        let _ = sw.next();
        {
            // Force a reversal by rewinding last_time_tick past "now".
            let mut state = sw.state.lock().unwrap();
            state.last_time_tick += 1000;
        }
        let mut seen = HashSet::new();
        for _ in 0..4 {
            let id = sw.next();
            let seq = id & 0x3f;
            assert!((1..=4).contains(&seq));
            assert!(seen.insert(id));
        }
    }
}

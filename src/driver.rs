//! The common surface shared by a single [`Snowflake`] engine and a
//! [`ShardedGenerator`]: whatever the facade has installed, it only needs
//! this trait to route calls (spec §2, §4.5).
//!
//! Grounded in `examples/original_source/options.go`'s `ISnowflake`
//! interface.

use crate::engine::Snowflake;
use crate::sharded::ShardedGenerator;

/// Anything the public facade can install and dispatch `next`/`extract_*`
/// calls to.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> i64;
    fn extract_time(&self, id: i64) -> i64;
    fn extract_worker_id(&self, id: i64) -> i64;
}

impl IdGenerator for Snowflake {
    fn next_id(&self) -> i64 {
        self.next()
    }

    fn extract_time(&self, id: i64) -> i64 {
        Snowflake::extract_time(self, id)
    }

    fn extract_worker_id(&self, id: i64) -> i64 {
        Snowflake::extract_worker(self, id)
    }
}

impl IdGenerator for ShardedGenerator {
    fn next_id(&self) -> i64 {
        self.next()
    }

    fn extract_time(&self, id: i64) -> i64 {
        ShardedGenerator::extract_time(self, id)
    }

    fn extract_worker_id(&self, id: i64) -> i64 {
        ShardedGenerator::extract_worker(self, id)
    }
}

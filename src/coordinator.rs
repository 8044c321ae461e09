//! The worker-id coordinator contract (spec §6.1): an external collaborator
//! this crate consumes only at its interface boundary. No concrete lease
//! backend (etcd, Redis, Kubernetes leases) lives here — those stay out of
//! scope (spec §1) — only the trait, the installation glue that wires an
//! acquired id into the facade, and an in-memory reference implementation
//! used by this crate's own tests.
//!
//! Grounded in `examples/original_source/manager.go`
//! (`WorkerIdManager`/`WithOptionsAndWorkerManager`).

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::CoordinatorError;
use crate::options::Options;
use crate::try_install;

/// Recommended lease TTL and renewal cadence (spec §6.1 defaults).
pub const DEFAULT_LEASE_EXPIRE: Duration = Duration::from_secs(30);
pub const DEFAULT_LEASE_RENEW: Duration = Duration::from_secs(10);

/// An external collaborator that leases a unique worker id to this process
/// out of `0..=max_worker_id` and keeps the lease alive.
///
/// Implementations typically wrap a cluster-coordination service or a
/// distributed KV store; `acquire` scans candidate ids and places an
/// exclusive, TTL'd lease, preempting one that has gone stale.
pub trait WorkerIdCoordinator: Send + Sync + 'static {
    /// Acquires an id in `0..=max_worker_id` that no other live process
    /// currently holds.
    fn acquire(&self, max_worker_id: i64) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;

    /// Refreshes the lease's renew time. Called on a background thread every
    /// `DEFAULT_LEASE_RENEW` (or the implementation's own cadence) until
    /// [`stop`](WorkerIdCoordinator::stop) is called.
    fn renew(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Releases the lease. Called once, on shutdown.
    fn stop(&self);
}

/// Acquires a worker id from `coordinator`, installs a generator built from
/// `options` with that id, and spawns a background thread that calls
/// `coordinator.renew()` every `renew_interval` until the returned
/// [`CoordinatorHandle`] is stopped or dropped.
///
/// Mirrors the Go reference's `WithOptionsAndWorkerManager`, which acquires
/// synchronously, installs, then runs renewal and shutdown handling on their
/// own goroutines; process signal handling stays the caller's
/// responsibility (spec §1 "signal handling... out of scope"), so unlike the
/// Go version this does not itself install a `SIGTERM` handler.
pub fn install_with_coordinator(
    options: Options,
    coordinator: Arc<dyn WorkerIdCoordinator>,
    renew_interval: Duration,
) -> Result<CoordinatorHandle, CoordinatorError> {
    let resolved = options.clone().validate()?;
    let worker_id = coordinator
        .acquire(resolved.max_worker_id())
        .map_err(CoordinatorError::AcquireFailed)?;

    tracing::info!(worker_id, "acquired worker id from coordinator");

    let mut with_worker_id = options;
    with_worker_id.worker_id = worker_id;
    try_install(with_worker_id)?;

    let stop_flag = Arc::new(Mutex::new(false));
    let renewal_handle = {
        let coordinator = Arc::clone(&coordinator);
        let stop_flag = Arc::clone(&stop_flag);
        std::thread::spawn(move || loop {
            std::thread::sleep(renew_interval);
            if *stop_flag.lock().expect("renewal stop flag poisoned") {
                break;
            }
            if let Err(err) = coordinator.renew() {
                tracing::warn!(error = %err, "failed to renew worker id lease");
            }
        })
    };

    Ok(CoordinatorHandle {
        coordinator,
        stop_flag,
        renewal_handle: Some(renewal_handle),
    })
}

/// Owns the renewal background thread started by
/// [`install_with_coordinator`]. Dropping or explicitly
/// [`stop`](CoordinatorHandle::stop)-ing it stops renewal and releases the
/// lease, matching the Go reference's signal-driven `manager.Stop()` call.
pub struct CoordinatorHandle {
    coordinator: Arc<dyn WorkerIdCoordinator>,
    stop_flag: Arc<Mutex<bool>>,
    renewal_handle: Option<JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Stops the renewal thread and releases the lease. Safe to call more
    /// than once.
    pub fn stop(&mut self) {
        *self.stop_flag.lock().expect("renewal stop flag poisoned") = true;
        if let Some(handle) = self.renewal_handle.take() {
            let _ = handle.join();
        }
        self.coordinator.stop();
        tracing::info!("worker id coordinator shutdown complete");
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub mod test_support {
    //! An in-memory reference [`WorkerIdCoordinator`] used by this crate's
    //! own tests; not a substitute for a real lease backend.
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    pub struct InMemoryCoordinator {
        next_id: AtomicI64,
        stopped: Arc<Mutex<bool>>,
    }

    impl InMemoryCoordinator {
        pub fn new() -> Self {
            InMemoryCoordinator {
                next_id: AtomicI64::new(0),
                stopped: Arc::new(Mutex::new(false)),
            }
        }

        pub fn is_stopped(&self) -> bool {
            *self.stopped.lock().unwrap()
        }
    }

    impl WorkerIdCoordinator for InMemoryCoordinator {
        fn acquire(
            &self,
            max_worker_id: i64,
        ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            if id > max_worker_id {
                return Err("all worker ids occupied".into());
            }
            Ok(id)
        }

        fn renew(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }

        fn stop(&self) {
            *self.stopped.lock().unwrap() = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryCoordinator;
    use super::*;
    use crate::next;

    #[test]
    fn acquires_and_installs_then_stops_cleanly() {
        let _guard = crate::INSTALL_TEST_LOCK.lock().unwrap();
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let mut handle = install_with_coordinator(
            Options::builder().worker_id_bit_length(4).seq_bit_length(6).build(),
            coordinator.clone(),
            Duration::from_millis(50),
        )
        .unwrap();

        let _ = next();
        handle.stop();
        assert!(coordinator.is_stopped());

        crate::install(crate::options::Options::default());
    }
}

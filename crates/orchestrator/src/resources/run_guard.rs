//! Single-flight guard for demo runs.
//!
//! At most one run may be active at any instant. The check-and-set is a
//! single compare-and-swap, so concurrent start requests cannot both win.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

/// Shared `active` flag for demo runs.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunGuard {
    /// Create an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark a run as active.
    ///
    /// Returns `false` without side effects if a run is already active.
    pub fn try_acquire(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark the guard idle. Idempotent.
    pub fn release(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Whether a run currently holds the guard.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Acquire the guard and wrap it in a lease that releases on drop.
    pub fn lease(&self) -> Option<RunLease> {
        if !self.try_acquire() {
            return None;
        }

        debug!("Run guard acquired");
        Some(RunLease {
            guard: self.clone(),
            released: false,
        })
    }
}

/// Held by the background task for the whole run.
///
/// Dropping the lease releases the guard, including when the task unwinds
/// from a panic.
#[derive(Debug)]
pub struct RunLease {
    guard: RunGuard,
    released: bool,
}

impl RunLease {
    /// Release the guard now instead of at drop.
    pub fn release(mut self) {
        self.guard.release();
        self.released = true;
        debug!("Run guard released");
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        if !self.released {
            if std::thread::panicking() {
                warn!("Run lease dropped during unwind - releasing guard");
            } else {
                debug!("Run guard released");
            }
            self.guard.release();
        }
    }
}

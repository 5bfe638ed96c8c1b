//! Ctrl+C coordination.
//!
//! The binary installs a signal handler that flips a [`ShutdownCoordinator`];
//! the aggregator polls it between courses and assignments and stops early,
//! so the rows gathered so far still reach the output file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

/// Shutdown flag shared between the signal handler and the export pipeline.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    requested: AtomicBool,
}

impl ShutdownCoordinator {
    /// Create a coordinator in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a coordinator wrapped in [`Arc`].
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Request shutdown. Returns `true` on the first request only.
    pub fn request_shutdown(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

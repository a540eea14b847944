//! Shared, coalescing circuit rotation
//!
//! Every fetcher holds the same `CircuitRotator`. A caller remembers the
//! generation it observed before its request failed; if another caller
//! rotated in the meantime the generation has moved on and the second
//! request is dropped instead of burning another circuit.

use crate::tor::CircuitControl;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct CircuitRotator {
    control: Arc<dyn CircuitControl>,
    generation: AtomicU64,
    rotations: AtomicU64,
    failures: AtomicU64,
    lock: Mutex<()>,
}

impl CircuitRotator {
    pub fn new(control: Arc<dyn CircuitControl>) -> Self {
        Self {
            control,
            generation: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            lock: Mutex::new(()),
        }
    }

    /// Current circuit generation; incremented by every rotation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Requests a new circuit unless one was already requested since `seen`
    ///
    /// Control-port errors are logged and swallowed: a failed rotation must
    /// not fail the crawl, the next request simply reuses the old circuit.
    ///
    /// # Returns
    ///
    /// `true` if this call issued the rotation, `false` if it was coalesced
    /// into a rotation another caller already made
    pub async fn rotate(&self, seen: u64) -> bool {
        let _guard = self.lock.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen {
            tracing::debug!("Circuit already rotated since generation {}, skipping", seen);
            return false;
        }

        match self.control.new_circuit().await {
            Ok(()) => tracing::info!("Requested new Tor circuit"),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Failed to request new Tor circuit: {}", e);
            }
        }

        self.rotations.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Number of rotations issued (including ones the control port rejected)
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::SeqCst)
    }

    /// Number of rotations the control port rejected or could not be reached for
    pub fn failed_rotations(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

//! Admission gate bounding simultaneously running downloads.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

/// Counting limiter sized to `max_concurrent_downloads`.
///
/// Resizing swaps in a fresh semaphore. Jobs already holding a permit keep
/// it until they finish; jobs still waiting are woken and re-queue on the
/// new semaphore.
#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: RwLock<Arc<Semaphore>>,
    capacity: AtomicUsize,
    closed: AtomicBool,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: RwLock::new(Arc::new(Semaphore::new(capacity))),
            capacity: AtomicUsize::new(capacity),
            closed: AtomicBool::new(false),
        }
    }

    /// Wait for a free slot.
    ///
    /// Never drops a waiter on resize. Fails with [`Error::ShuttingDown`]
    /// once the gate is closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::ShuttingDown);
            }

            let semaphore = self.semaphore.read().await.clone();
            match semaphore.acquire_owned().await {
                Ok(permit) => return Ok(permit),
                // replaced by resize() or closed by close()
                Err(_) => continue,
            }
        }
    }

    /// Replace the semaphore with one of `capacity` slots
    pub async fn resize(&self, capacity: usize) {
        let mut current = self.semaphore.write().await;
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let previous = std::mem::replace(&mut *current, Arc::new(Semaphore::new(capacity)));
        previous.close();
        self.capacity.store(capacity, Ordering::SeqCst);
    }

    /// Configured number of slots
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// Free slots on the current semaphore
    pub async fn available(&self) -> usize {
        self.semaphore.read().await.available_permits()
    }

    /// Stop handing out slots; current and future waiters fail
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.semaphore.read().await.close();
    }
}

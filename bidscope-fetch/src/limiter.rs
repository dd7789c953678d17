//! Concurrency limiter for outbound requests.
//!
//! Bounds the number of futures running at once. Waiters are admitted in
//! arrival order (the underlying tokio semaphore is fair), and a slot is
//! released when the future finishes, whether it succeeded or not.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

/// Default number of concurrent requests.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

#[derive(Debug)]
struct LimiterState {
    semaphore: Semaphore,
    max_concurrent: Mutex<usize>,
    in_flight: AtomicUsize,
    waiting: AtomicUsize,
    /// Permits still to be retired after the limit was lowered.
    pending_shrink: AtomicUsize,
}

/// Shared FIFO limiter. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    state: Arc<LimiterState>,
}

impl ConcurrencyLimiter {
    /// Creates a limiter. A limit of zero is treated as one.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            state: Arc::new(LimiterState {
                semaphore: Semaphore::new(max_concurrent),
                max_concurrent: Mutex::new(max_concurrent),
                in_flight: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                pending_shrink: AtomicUsize::new(0),
            }),
        }
    }

    /// Runs `task` once a slot is free.
    pub async fn execute<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let permit = {
            let _waiting = Counter::enter(&self.state.waiting);
            self.state.semaphore.acquire().await
        };
        let permit = match permit {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!("Limiter closed, running without a slot");
                None
            }
        };

        let _slot = Slot {
            state: &self.state,
            permit,
            _in_flight: Counter::enter(&self.state.in_flight),
        };
        task.await
    }

    /// Changes the limit at runtime.
    ///
    /// Raising it admits queued tasks immediately. Lowering it retires idle
    /// slots now and busy ones as they are released.
    pub fn set_max_concurrent(&self, max_concurrent: usize) {
        let new = max_concurrent.max(1);
        let mut current = self
            .state
            .max_concurrent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let old = *current;
        *current = new;

        if new > old {
            let mut grow = new - old;
            let cancelled = take_up_to(&self.state.pending_shrink, grow);
            grow -= cancelled;
            self.state.semaphore.add_permits(grow);
        } else if new < old {
            let shrink = old - new;
            let forgotten = self.state.semaphore.forget_permits(shrink);
            self.state
                .pending_shrink
                .fetch_add(shrink - forgotten, Ordering::SeqCst);
        }
        debug!(old, new, "Concurrency limit changed");
    }

    /// Current limit.
    pub fn max_concurrent(&self) -> usize {
        *self
            .state
            .max_concurrent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Tasks waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.state.waiting.load(Ordering::SeqCst)
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

/// Decrements `counter` by up to `n`, returning how much was taken.
fn take_up_to(counter: &AtomicUsize, n: usize) -> usize {
    let mut taken = 0;
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
        taken = current.min(n);
        Some(current - taken)
    });
    taken
}

struct Counter<'a>(&'a AtomicUsize);

impl<'a> Counter<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Counter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Slot<'a> {
    state: &'a LimiterState,
    permit: Option<SemaphorePermit<'a>>,
    _in_flight: Counter<'a>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            if take_up_to(&self.state.pending_shrink, 1) == 1 {
                permit.forget();
            }
        }
    }
}

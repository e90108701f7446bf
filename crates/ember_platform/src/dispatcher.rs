//! UI-affine execution context
//!
//! Measurement, gesture callbacks and repaint requests run on one logical UI
//! context. Platform adapters implement [`UiDispatcher`] on top of their main
//! loop; [`QueueDispatcher`] is the pumped implementation used by headless
//! hosts and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Work item marshaled onto the UI context
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Schedules work on the UI-affine context
pub trait UiDispatcher: Send + Sync {
    /// Run `task` after at least `delay`
    fn post_delayed(&self, delay: Duration, task: Task);

    /// Run `task` on the next loop iteration
    fn post(&self, task: Task) {
        self.post_delayed(Duration::ZERO, task);
    }
}

struct Scheduled {
    due: Instant,
    delay: Duration,
    seq: u64,
    task: Task,
}

/// Upper bound on drain passes so a self-reposting task cannot spin forever
const MAX_DRAIN_ROUNDS: usize = 64;

/// Task queue pumped by the owner's loop
///
/// Tasks run in due-time order, ties in posting order. Tasks are always run
/// with the queue lock released, so they may post more work.
pub struct QueueDispatcher {
    queue: Mutex<Vec<Scheduled>>,
    seq: AtomicU64,
}

impl Default for QueueDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueDispatcher {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requested delays of the queued tasks, in run order
    pub fn pending_delays(&self) -> Vec<Duration> {
        let mut queue = self.queue.lock().unwrap();
        queue.sort_by_key(|s| (s.due, s.seq));
        queue.iter().map(|s| s.delay).collect()
    }

    /// When the earliest task becomes due, for the host loop's wait timeout
    pub fn next_due(&self) -> Option<Instant> {
        self.queue.lock().unwrap().iter().map(|s| s.due).min()
    }

    /// Run every task that is due now; tasks posted meanwhile wait
    pub fn run_due(&self) -> usize {
        let now = Instant::now();
        let ready = {
            let mut queue = self.queue.lock().unwrap();
            let (mut ready, rest): (Vec<_>, Vec<_>) =
                queue.drain(..).partition(|s| s.due <= now);
            *queue = rest;
            ready.sort_by_key(|s| (s.due, s.seq));
            ready
        };
        let count = ready.len();
        for scheduled in ready {
            (scheduled.task)();
        }
        count
    }

    /// Run everything, ignoring delays, until the queue stays empty
    pub fn drain(&self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_DRAIN_ROUNDS {
            let mut batch = std::mem::take(&mut *self.queue.lock().unwrap());
            if batch.is_empty() {
                return total;
            }
            batch.sort_by_key(|s| (s.due, s.seq));
            total += batch.len();
            for scheduled in batch {
                (scheduled.task)();
            }
        }
        tracing::warn!(
            "QueueDispatcher::drain stopped after {} rounds with {} tasks left",
            MAX_DRAIN_ROUNDS,
            self.len()
        );
        total
    }
}

impl UiDispatcher for QueueDispatcher {
    fn post_delayed(&self, delay: Duration, task: Task) {
        let scheduled = Scheduled {
            due: Instant::now() + delay,
            delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            task,
        };
        self.queue.lock().unwrap().push(scheduled);
    }
}

//! Deferred-action queues drained once per frame

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

/// Work postponed to a frame boundary
pub type DeferredAction = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of actions run at one frame boundary
///
/// `drain` takes the current contents first, so actions enqueued while the
/// queue is draining wait for the next drain. A panicking action is logged
/// and the rest still run.
pub struct DeferredQueue {
    name: &'static str,
    actions: Mutex<Vec<DeferredAction>>,
}

impl DeferredQueue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, action: DeferredAction) {
        self.actions.lock().unwrap().push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run everything queued so far; returns the number of panicked actions
    pub fn drain(&self) -> usize {
        let batch = std::mem::take(&mut *self.actions.lock().unwrap());
        let mut failed = 0;
        for action in batch {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(action)) {
                failed += 1;
                tracing::error!(
                    "{} action panicked: {}",
                    self.name,
                    panic_message(panic.as_ref())
                );
            }
        }
        failed
    }

    /// Drop queued actions without running them
    pub fn clear(&self) {
        self.actions.lock().unwrap().clear();
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

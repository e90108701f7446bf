//! Delayed node disposal
//!
//! Nodes handed to `dispose_node_after` stay alive until their delay elapses,
//! so animations still referencing them finish against a live node. The root
//! processes expired entries after each draw.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ember_core::{NodeId, SceneNode};
use rustc_hash::FxHashSet;

struct Scheduled {
    due: Instant,
    node: Arc<dyn SceneNode>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Scheduled>,
    ids: FxHashSet<NodeId>,
}

#[derive(Default)]
pub struct DisposalQueue {
    inner: Mutex<Inner>,
}

impl DisposalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the node is already scheduled
    pub fn schedule(&self, node: Arc<dyn SceneNode>, delay: Duration) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.ids.insert(node.id()) {
            return false;
        }
        inner.entries.push(Scheduled {
            due: Instant::now() + delay,
            node,
        });
        true
    }

    pub fn is_scheduled(&self, node: NodeId) -> bool {
        self.inner.lock().unwrap().ids.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return the nodes whose delay has elapsed at `now`
    pub fn take_expired(&self, now: Instant) -> Vec<Arc<dyn SceneNode>> {
        let mut inner = self.inner.lock().unwrap();
        let (expired, waiting): (Vec<_>, Vec<_>) =
            inner.entries.drain(..).partition(|s| s.due <= now);
        inner.entries = waiting;
        for scheduled in &expired {
            inner.ids.remove(&scheduled.node.id());
        }
        expired.into_iter().map(|s| s.node).collect()
    }

    /// Remove everything regardless of delay
    pub fn take_all(&self) -> Vec<Arc<dyn SceneNode>> {
        let mut inner = self.inner.lock().unwrap();
        inner.ids.clear();
        inner.entries.drain(..).map(|s| s.node).collect()
    }
}

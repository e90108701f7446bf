//! Per-root animator set
//!
//! Insertions are queued and only applied by [`AnimatorRegistry::apply_pending`],
//! which the root container runs right before each draw. Ticking works on a
//! snapshot taken under the lock, so animators added or removed from inside
//! a tick never disturb the enumeration in progress.

use std::hash::BuildHasherDefault;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use ember_core::NodeId;
use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::animator::{owner_status, Animator, AnimatorId, OwnerStatus};

type AnimatorMap = IndexMap<AnimatorId, Arc<dyn Animator>, BuildHasherDefault<FxHasher>>;

/// Outcome of one [`AnimatorRegistry::execute`] pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecuteStats {
    /// Animators whose `tick_frame` ran
    pub executed: usize,
    /// Animators paused because their owner is hidden
    pub paused: usize,
    /// Entries reaped after the enumeration
    pub removed: usize,
    /// Animators that panicked in their tick or overlay and were deactivated
    pub failed: usize,
}

/// Insertion-ordered, identity-unique animator set
#[derive(Default)]
pub struct AnimatorRegistry {
    active: Mutex<AnimatorMap>,
    pending: Mutex<AnimatorMap>,
}

impl AnimatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `animator` for insertion before the next draw
    ///
    /// Returns false when the same identity is already active or queued.
    pub fn queue_insert(&self, animator: Arc<dyn Animator>) -> bool {
        let id = animator.id();
        if self.active.lock().unwrap().contains_key(&id) {
            return false;
        }
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(&id) {
            return false;
        }
        pending.insert(id, animator);
        true
    }

    /// Move queued animators into the active set
    pub fn apply_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        if pending.is_empty() {
            return 0;
        }
        let mut active = self.active.lock().unwrap();
        let mut added = 0;
        for (id, animator) in pending {
            if let indexmap::map::Entry::Vacant(slot) = active.entry(id) {
                slot.insert(animator);
                added += 1;
            }
        }
        added
    }

    /// Remove an active or queued animator
    pub fn remove(&self, id: AnimatorId) -> Option<Arc<dyn Animator>> {
        let removed = self.active.lock().unwrap().shift_remove(&id);
        removed.or_else(|| self.pending.lock().unwrap().shift_remove(&id))
    }

    /// Deactivate and remove every animator owned by `node`
    pub fn remove_by_owner(&self, node: NodeId) -> usize {
        let owned_by = |animator: &Arc<dyn Animator>| {
            animator
                .owner()
                .and_then(|weak| weak.upgrade())
                .is_some_and(|owner| owner.id() == node)
        };

        let mut removed = Vec::new();
        for map in [&self.active, &self.pending] {
            let mut map = map.lock().unwrap();
            map.retain(|_, animator| {
                if owned_by(animator) {
                    removed.push(Arc::clone(animator));
                    false
                } else {
                    true
                }
            });
        }
        for animator in &removed {
            animator.deactivate();
        }
        removed.len()
    }

    pub fn contains(&self, id: AnimatorId) -> bool {
        self.active.lock().unwrap().contains_key(&id)
    }

    pub fn is_queued(&self, id: AnimatorId) -> bool {
        self.pending.lock().unwrap().contains_key(&id)
    }

    /// Number of active animators
    pub fn len(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().unwrap().is_empty()
    }

    /// Tick every active animator once
    ///
    /// `on_executed` runs right after an animator's tick; overlay registries
    /// use it to draw. Stopped, deactivated and orphaned animators and those
    /// that report finished are removed after the whole pass. An animator
    /// that panics in either step is deactivated and removed; the rest of
    /// the pass carries on.
    pub fn execute<F>(&self, frame_time_nanos: u64, mut on_executed: F) -> ExecuteStats
    where
        F: FnMut(&dyn Animator),
    {
        let snapshot: Vec<Arc<dyn Animator>> =
            self.active.lock().unwrap().values().cloned().collect();

        let mut stats = ExecuteStats::default();
        let mut reap = Vec::new();

        for animator in &snapshot {
            if animator.is_deactivated() || (!animator.is_running() && !animator.is_paused()) {
                reap.push(animator.id());
                continue;
            }

            match owner_status(animator.as_ref()) {
                OwnerStatus::Gone => {
                    reap.push(animator.id());
                    continue;
                }
                OwnerStatus::Hidden => {
                    animator.pause();
                    stats.paused += 1;
                    continue;
                }
                OwnerStatus::Free | OwnerStatus::Visible => {}
            }

            if animator.is_paused() {
                animator.resume();
            }

            let ticked = catch_unwind(AssertUnwindSafe(|| {
                let finished = animator.tick_frame(frame_time_nanos);
                on_executed(animator.as_ref());
                finished
            }));
            stats.executed += 1;

            match ticked {
                Ok(true) => {
                    animator.stop();
                    reap.push(animator.id());
                }
                Ok(false) => {}
                Err(panic) => {
                    tracing::error!(
                        "AnimatorRegistry: {:?} panicked, removing it: {}",
                        animator.id(),
                        panic_message(panic.as_ref())
                    );
                    animator.deactivate();
                    stats.failed += 1;
                    reap.push(animator.id());
                }
            }
        }

        if !reap.is_empty() {
            let mut active = self.active.lock().unwrap();
            for id in reap {
                if active.shift_remove(&id).is_some() {
                    stats.removed += 1;
                }
            }
        }

        if stats.removed > 0 {
            tracing::trace!(
                "AnimatorRegistry: executed {}, reaped {}",
                stats.executed,
                stats.removed
            );
        }
        stats
    }

    /// Deactivate and drop everything, pending inserts included
    pub fn clear(&self) {
        let active = std::mem::take(&mut *self.active.lock().unwrap());
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for animator in active.values().chain(pending.values()) {
            animator.deactivate();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::{owner_ref, AnimatorState};
    use ember_core::{FrameContext, Rect, SceneNode, Size};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Weak;

    struct Counter {
        id: AnimatorId,
        state: AnimatorState,
        ticks: AtomicUsize,
        finish_after: usize,
        owner: Option<Weak<dyn SceneNode>>,
    }

    impl Counter {
        fn new(finish_after: usize) -> Arc<Self> {
            Self::owned(finish_after, None)
        }

        fn owned(finish_after: usize, owner: Option<Weak<dyn SceneNode>>) -> Arc<Self> {
            let counter = Arc::new(Self {
                id: AnimatorId::next(),
                state: AnimatorState::new(),
                ticks: AtomicUsize::new(0),
                finish_after,
                owner,
            });
            counter.start();
            counter
        }

        fn ticks(&self) -> usize {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    impl Animator for Counter {
        fn id(&self) -> AnimatorId {
            self.id
        }

        fn state(&self) -> &AnimatorState {
            &self.state
        }

        fn owner(&self) -> Option<Weak<dyn SceneNode>> {
            self.owner.clone()
        }

        fn tick_frame(&self, _frame_time_nanos: u64) -> bool {
            self.ticks.fetch_add(1, Ordering::SeqCst) + 1 >= self.finish_after
        }
    }

    struct Owner {
        id: NodeId,
        visible: AtomicBool,
    }

    impl SceneNode for Owner {
        fn id(&self) -> NodeId {
            self.id
        }

        fn render(&self, _ctx: &mut FrameContext<'_>, _bounds: Rect, _scale: f32) {}

        fn measure(&self, _w: f32, _h: f32) -> Size {
            Size::ZERO
        }

        fn is_visible(&self) -> bool {
            self.visible.load(Ordering::SeqCst)
        }

        fn is_disposed(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_insert_is_deferred_and_idempotent() {
        let registry = AnimatorRegistry::new();
        let animator = Counter::new(usize::MAX);

        assert!(registry.queue_insert(animator.clone()));
        assert!(!registry.queue_insert(animator.clone()));
        assert!(!registry.contains(animator.id()));

        assert_eq!(registry.apply_pending(), 1);
        assert!(!registry.queue_insert(animator.clone()));
        assert_eq!(registry.apply_pending(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_animator_added_mid_tick_runs_next_tick() {
        let registry = Arc::new(AnimatorRegistry::new());
        let first = Counter::new(usize::MAX);
        let late = Counter::new(usize::MAX);
        registry.queue_insert(first.clone());
        registry.apply_pending();

        let stats = registry.execute(1, |_| {
            registry.queue_insert(late.clone());
            registry.apply_pending();
        });
        assert_eq!(stats.executed, 1);
        assert_eq!(late.ticks(), 0);

        registry.execute(2, |_| {});
        assert_eq!(late.ticks(), 1);
    }

    #[test]
    fn test_finished_animator_self_stops_and_is_reaped() {
        let registry = AnimatorRegistry::new();
        let animator = Counter::new(2);
        registry.queue_insert(animator.clone());
        registry.apply_pending();

        assert_eq!(registry.execute(1, |_| {}).removed, 0);
        let stats = registry.execute(2, |_| {});
        assert_eq!(stats.removed, 1);
        assert!(!animator.is_running());
        assert!(!registry.contains(animator.id()));

        assert_eq!(registry.execute(3, |_| {}).executed, 0);
        assert_eq!(animator.ticks(), 2);
    }

    #[test]
    fn test_panicking_animator_is_removed_and_others_still_tick() {
        struct Faulty {
            id: AnimatorId,
            state: AnimatorState,
            ticks: AtomicUsize,
        }

        impl Animator for Faulty {
            fn id(&self) -> AnimatorId {
                self.id
            }

            fn state(&self) -> &AnimatorState {
                &self.state
            }

            fn tick_frame(&self, _frame_time_nanos: u64) -> bool {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                panic!("tick exploded")
            }
        }

        let registry = AnimatorRegistry::new();
        let faulty = Arc::new(Faulty {
            id: AnimatorId::next(),
            state: AnimatorState::new(),
            ticks: AtomicUsize::new(0),
        });
        faulty.start();
        let healthy = Counter::new(usize::MAX);
        registry.queue_insert(faulty.clone());
        registry.queue_insert(healthy.clone());
        registry.apply_pending();

        let stats = registry.execute(1, |_| {});
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.removed, 1);
        assert!(faulty.is_deactivated());
        assert!(!registry.contains(faulty.id()));
        assert_eq!(healthy.ticks(), 1);

        registry.execute(2, |_| {});
        assert_eq!(faulty.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.ticks(), 2);
    }

    #[test]
    fn test_panicking_overlay_callback_removes_only_that_animator() {
        let registry = AnimatorRegistry::new();
        let first = Counter::new(usize::MAX);
        let second = Counter::new(usize::MAX);
        registry.queue_insert(first.clone());
        registry.queue_insert(second.clone());
        registry.apply_pending();

        let bad = first.id();
        let stats = registry.execute(1, |animator| {
            if animator.id() == bad {
                panic!("overlay exploded");
            }
        });
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.failed, 1);
        assert!(!registry.contains(first.id()));
        assert!(registry.contains(second.id()));
    }

    #[test]
    fn test_hidden_owner_pauses_and_visible_owner_resumes() {
        let owner = Arc::new(Owner {
            id: NodeId::next(),
            visible: AtomicBool::new(false),
        });
        let registry = AnimatorRegistry::new();
        let animator = Counter::owned(usize::MAX, Some(owner_ref(&owner)));
        registry.queue_insert(animator.clone());
        registry.apply_pending();

        let stats = registry.execute(1, |_| {});
        assert_eq!(stats.paused, 1);
        assert!(animator.is_paused());
        assert!(registry.contains(animator.id()));
        assert_eq!(animator.ticks(), 0);

        owner.visible.store(true, Ordering::SeqCst);
        registry.execute(2, |_| {});
        assert!(animator.is_running());
        assert_eq!(animator.ticks(), 1);
    }

    #[test]
    fn test_dropped_owner_and_deactivation_reap() {
        let owner = Arc::new(Owner {
            id: NodeId::next(),
            visible: AtomicBool::new(true),
        });
        let registry = AnimatorRegistry::new();
        let orphan = Counter::owned(usize::MAX, Some(owner_ref(&owner)));
        let deactivated = Counter::new(usize::MAX);
        registry.queue_insert(orphan.clone());
        registry.queue_insert(deactivated.clone());
        registry.apply_pending();

        drop(owner);
        deactivated.deactivate();

        let stats = registry.execute(1, |_| {});
        assert_eq!(stats.executed, 0);
        assert_eq!(stats.removed, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_by_owner_deactivates() {
        let owner = Arc::new(Owner {
            id: NodeId::next(),
            visible: AtomicBool::new(true),
        });
        let registry = AnimatorRegistry::new();
        let owned = Counter::owned(usize::MAX, Some(owner_ref(&owner)));
        let free = Counter::new(usize::MAX);
        registry.queue_insert(owned.clone());
        registry.queue_insert(free.clone());
        registry.apply_pending();

        assert_eq!(registry.remove_by_owner(owner.id), 1);
        assert!(owned.is_deactivated());
        assert!(registry.contains(free.id()));
    }
}

//! Animator contract
//!
//! An animator is a time-driven mutation that the registry ticks once per
//! frame until it finishes, is stopped, or is deactivated.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ember_core::{FrameContext, SceneNode};

static NEXT_ANIMATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Stable animator identity; the registry keys its set by this
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(u64);

impl AnimatorId {
    pub fn next() -> Self {
        AnimatorId(NEXT_ANIMATOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnimatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animator#{}", self.0)
    }
}

/// Run/pause/deactivate flags shared by every animator
///
/// `paused` implies not running. An animator that is neither running nor
/// paused counts as stopped and is reaped on the next tick. Deactivation is
/// permanent.
#[derive(Debug, Default)]
pub struct AnimatorState {
    running: AtomicBool,
    paused: AtomicBool,
    deactivated: AtomicBool,
}

impl AnimatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated.load(Ordering::Acquire)
    }

    /// Returns false when deactivated
    pub fn start(&self) -> bool {
        if self.is_deactivated() {
            return false;
        }
        self.paused.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
        true
    }

    pub fn pause(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.paused.store(true, Ordering::Release);
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::AcqRel) && !self.is_deactivated() {
            self.running.store(true, Ordering::Release);
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
    }

    /// Idempotent
    pub fn deactivate(&self) {
        self.deactivated.store(true, Ordering::Release);
        self.stop();
    }
}

/// A time-driven mutation ticked by the [`AnimatorRegistry`]
///
/// Implementors only supply [`id`](Animator::id), [`state`](Animator::state)
/// and [`tick_frame`](Animator::tick_frame); the lifecycle methods are
/// provided on top of the shared [`AnimatorState`].
///
/// [`AnimatorRegistry`]: crate::AnimatorRegistry
pub trait Animator: Send + Sync {
    fn id(&self) -> AnimatorId;

    fn state(&self) -> &AnimatorState;

    /// Owning node. `None` means free-running; a dropped owner counts as
    /// disposed.
    fn owner(&self) -> Option<Weak<dyn SceneNode>> {
        None
    }

    /// Advance to `frame_time_nanos`; returns true when finished
    fn tick_frame(&self, frame_time_nanos: u64) -> bool;

    /// Draw after the main subtree; only called for overlay animators
    fn render_overlay(&self, _ctx: &mut FrameContext<'_>) {}

    fn is_running(&self) -> bool {
        self.state().is_running()
    }

    fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    fn is_deactivated(&self) -> bool {
        self.state().is_deactivated()
    }

    fn start(&self) -> bool {
        self.state().start()
    }

    fn pause(&self) {
        self.state().pause()
    }

    fn resume(&self) {
        self.state().resume()
    }

    fn stop(&self) {
        self.state().stop()
    }

    fn deactivate(&self) {
        self.state().deactivate()
    }
}

/// Owner status as seen by the registry at tick time
pub(crate) enum OwnerStatus {
    Free,
    Gone,
    Hidden,
    Visible,
}

pub(crate) fn owner_status(animator: &dyn Animator) -> OwnerStatus {
    let Some(weak) = animator.owner() else {
        return OwnerStatus::Free;
    };
    match weak.upgrade() {
        None => OwnerStatus::Gone,
        Some(node) if node.is_disposed() => OwnerStatus::Gone,
        Some(node) if !node.is_visible_in_tree() => OwnerStatus::Hidden,
        Some(_) => OwnerStatus::Visible,
    }
}

/// Downgrade a concrete node into the owner reference animators store
pub fn owner_ref<N: SceneNode + 'static>(node: &Arc<N>) -> Weak<dyn SceneNode> {
    let node: Arc<dyn SceneNode> = node.clone();
    Arc::downgrade(&node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let state = AnimatorState::new();
        assert!(!state.is_running());

        assert!(state.start());
        state.pause();
        assert!(state.is_paused());
        assert!(!state.is_running());

        state.resume();
        assert!(state.is_running());
        assert!(!state.is_paused());

        state.deactivate();
        state.deactivate();
        assert!(state.is_deactivated());
        assert!(!state.start());
        assert!(!state.is_running());
    }

    #[test]
    fn test_pause_of_stopped_animator_stays_stopped() {
        let state = AnimatorState::new();
        state.pause();
        assert!(!state.is_paused());
        state.resume();
        assert!(!state.is_running());
    }
}

//! Duration-based animator

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, Weak};
use std::time::Duration;

use ember_core::SceneNode;

use crate::animator::{Animator, AnimatorId, AnimatorState};
use crate::easing::Easing;

/// Interpolates `from → to` over a fixed duration
///
/// The first tick pins the start time, so a tween registered mid-frame
/// begins on the frame that first ticks it.
pub struct TweenAnimator {
    id: AnimatorId,
    state: AnimatorState,
    owner: Option<Weak<dyn SceneNode>>,
    from: f32,
    to: f32,
    duration_nanos: u64,
    easing: Easing,
    started_at: AtomicU64,
    progress: Mutex<f32>,
    on_value: Box<dyn Fn(f32) + Send + Sync>,
}

impl TweenAnimator {
    pub fn new<F>(from: f32, to: f32, duration: Duration, on_value: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        Self {
            id: AnimatorId::next(),
            state: AnimatorState::new(),
            owner: None,
            from,
            to,
            duration_nanos: duration.as_nanos() as u64,
            easing: Easing::Linear,
            started_at: AtomicU64::new(0),
            progress: Mutex::new(0.0),
            on_value: Box::new(on_value),
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_owner(mut self, owner: Weak<dyn SceneNode>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Linear progress 0.0..=1.0 as of the last tick
    pub fn progress(&self) -> f32 {
        *self.progress.lock().unwrap()
    }

    pub fn value_at(&self, progress: f32) -> f32 {
        self.from + (self.to - self.from) * self.easing.apply(progress)
    }
}

impl Animator for TweenAnimator {
    fn id(&self) -> AnimatorId {
        self.id
    }

    fn state(&self) -> &AnimatorState {
        &self.state
    }

    fn owner(&self) -> Option<Weak<dyn SceneNode>> {
        self.owner.clone()
    }

    fn tick_frame(&self, frame_time_nanos: u64) -> bool {
        let started = match self.started_at.compare_exchange(
            0,
            frame_time_nanos.max(1),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => frame_time_nanos.max(1),
            Err(existing) => existing,
        };

        let progress = if self.duration_nanos == 0 {
            1.0
        } else {
            let elapsed = frame_time_nanos.saturating_sub(started);
            (elapsed as f64 / self.duration_nanos as f64).min(1.0) as f32
        };
        *self.progress.lock().unwrap() = progress;

        (self.on_value)(self.value_at(progress));
        progress >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tween_runs_for_its_duration() {
        let last = Arc::new(Mutex::new(f32::NAN));
        let sink = Arc::clone(&last);
        let tween = TweenAnimator::new(0.0, 100.0, Duration::from_millis(100), move |v| {
            *sink.lock().unwrap() = v
        });

        let ms = 1_000_000u64;
        assert!(!tween.tick_frame(1_000 * ms));
        assert_eq!(*last.lock().unwrap(), 0.0);
        assert!(!tween.tick_frame(1_050 * ms));
        assert!((*last.lock().unwrap() - 50.0).abs() < 0.01);
        assert!(tween.tick_frame(1_100 * ms));
        assert_eq!(*last.lock().unwrap(), 100.0);
        assert_eq!(tween.progress(), 1.0);
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let tween = TweenAnimator::new(1.0, 2.0, Duration::ZERO, |_| {})
            .with_easing(Easing::EaseInOut);
        assert!(tween.tick_frame(5));
        assert_eq!(tween.value_at(tween.progress()), 2.0);
    }
}

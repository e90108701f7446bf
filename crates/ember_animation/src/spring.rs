//! Spring physics and the spring-driven animator
//!
//! The spring is integrated with RK4 so large frame gaps stay stable. The
//! animator integrates from the previous frame time, clamping long stalls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, Weak};

use ember_core::SceneNode;

use crate::animator::{Animator, AnimatorId, AnimatorState};

/// Stiffness, damping and mass of a spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass: if mass > 0.0 { mass } else { 1.0 },
        }
    }

    /// Slow with a soft overshoot
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// Visible bounce
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// Quick with a slight overshoot
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// A damped spring pulling `value` toward `target`
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    rest_distance: f32,
    rest_velocity: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
            rest_distance: 0.5,
            rest_velocity: 5.0,
        }
    }

    /// Distance and speed under which the spring snaps to rest
    pub fn with_rest_thresholds(mut self, distance: f32, velocity: f32) -> Self {
        self.rest_distance = distance.abs();
        self.rest_velocity = velocity.abs();
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Retarget; current velocity carries over
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < self.rest_distance
            && self.velocity.abs() < self.rest_velocity
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            return;
        }
        if dt <= 0.0 {
            return;
        }

        let (x, v) = (self.value, self.velocity);
        let half = dt * 0.5;

        let a1 = self.acceleration(x, v);
        let a2 = self.acceleration(x + v * half, v + a1 * half);
        let v2 = v + a1 * half;
        let a3 = self.acceleration(x + v2 * half, v + a2 * half);
        let v3 = v + a2 * half;
        let a4 = self.acceleration(x + v3 * dt, v + a3 * dt);
        let v4 = v + a3 * dt;

        self.value = x + (v + 2.0 * v2 + 2.0 * v3 + v4) * dt / 6.0;
        self.velocity = v + (a1 + 2.0 * a2 + 2.0 * a3 + a4) * dt / 6.0;
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        (-self.config.stiffness * (x - self.target) - self.config.damping * v) / self.config.mass
    }
}

/// Longest step integrated in one frame, seconds
const MAX_STEP_SECS: f32 = 0.064;

type ValueSink = Box<dyn Fn(f32) + Send + Sync>;

/// Animator that drives a value with a [`Spring`] until it settles
pub struct SpringAnimator {
    id: AnimatorId,
    state: AnimatorState,
    owner: Option<Weak<dyn SceneNode>>,
    spring: Mutex<Spring>,
    last_frame: AtomicU64,
    on_value: ValueSink,
}

impl SpringAnimator {
    pub fn new<F>(spring: Spring, on_value: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        Self {
            id: AnimatorId::next(),
            state: AnimatorState::new(),
            owner: None,
            spring: Mutex::new(spring),
            last_frame: AtomicU64::new(0),
            on_value: Box::new(on_value),
        }
    }

    /// Tie the animator to a node; it pauses while the node is hidden
    pub fn with_owner(mut self, owner: Weak<dyn SceneNode>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn value(&self) -> f32 {
        self.spring.lock().unwrap().value()
    }

    pub fn set_target(&self, target: f32) {
        self.spring.lock().unwrap().set_target(target);
    }
}

impl Animator for SpringAnimator {
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
        let last = self.last_frame.swap(frame_time_nanos, Ordering::AcqRel);
        let dt = if last == 0 {
            0.0
        } else {
            (frame_time_nanos.saturating_sub(last) as f32 / 1e9).min(MAX_STEP_SECS)
        };

        let (value, settled) = {
            let mut spring = self.spring.lock().unwrap();
            spring.step(dt);
            let settled = spring.is_settled();
            if settled {
                spring.step(0.0);
            }
            (spring.value(), settled)
        };
        (self.on_value)(value);
        settled
    }

    fn resume(&self) {
        // Restart integration so a long pause is not one giant step
        self.last_frame.store(0, Ordering::Release);
        self.state.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const FRAME: u64 = 16_666_667;

    #[test]
    fn test_spring_settles_to_target() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0);
        spring.set_target(100.0);
        for _ in 0..120 {
            spring.step(1.0 / 60.0);
        }
        assert!(spring.is_settled());
        assert!((spring.value() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_retarget_keeps_velocity() {
        let mut spring = Spring::new(SpringConfig::wobbly(), 0.0);
        spring.set_target(100.0);
        for _ in 0..10 {
            spring.step(1.0 / 60.0);
        }
        let velocity = spring.velocity();
        assert!(velocity > 0.0);
        spring.set_target(50.0);
        assert_eq!(spring.velocity(), velocity);
    }

    #[test]
    fn test_large_steps_stay_bounded() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0);
        spring.set_target(1000.0);
        for _ in 0..100 {
            spring.step(0.1);
            assert!(spring.value() < 2000.0 && spring.value() > -500.0);
        }
    }

    #[test]
    fn test_presets_are_underdamped() {
        assert!(SpringConfig::gentle().is_underdamped());
        assert!(SpringConfig::wobbly().is_underdamped());
        assert!(SpringConfig::stiff().is_underdamped());
    }

    #[test]
    fn test_animator_reports_values_and_finishes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0);
        spring.set_target(10.0);
        let animator = SpringAnimator::new(spring, move |v| sink.lock().unwrap().push(v));

        let mut finished = false;
        let mut frames = 0;
        while !finished && frames < 600 {
            frames += 1;
            finished = animator.tick_frame(frames * FRAME);
        }

        assert!(finished);
        assert_eq!(animator.value(), 10.0);
        assert_eq!(seen.lock().unwrap().last().copied(), Some(10.0));
    }
}

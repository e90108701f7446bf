//! Ember Animation System
//!
//! Time-driven mutations ticked once per frame by the root container.
//!
//! # Features
//!
//! - **Animator contract**: [`Animator`] with shared run/pause/deactivate
//!   flags in [`AnimatorState`] and an optional weak owner node
//! - **Registry**: [`AnimatorRegistry`] with deferred insertion, snapshot
//!   ticking, visibility-driven pause/resume and post-pass reaping
//! - **Spring Physics**: RK4-integrated [`Spring`] and [`SpringAnimator`]
//! - **Tweens**: [`TweenAnimator`] with [`Easing`] curves

pub mod animator;
pub mod easing;
pub mod registry;
pub mod spring;
pub mod tween;

pub use animator::{owner_ref, Animator, AnimatorId, AnimatorState};
pub use easing::Easing;
pub use registry::{AnimatorRegistry, ExecuteStats};
pub use spring::{Spring, SpringAnimator, SpringConfig};
pub use tween::TweenAnimator;

//! Ember Runtime
//!
//! The frame engine: invalidation and frame pacing, the per-frame
//! composition pipeline, animator ticking and gesture routing.
//!
//! # Architecture
//!
//! - [`FrameScheduler`] - dirty/pending/busy state machine that turns
//!   `update()` calls into paced repaint requests on the active surface
//! - [`RootContainer`] - single-child entry node whose `paint` is the
//!   surface draw handler; owns the registries and deferred queues
//! - [`GestureDispatcher`] - z-ordered listener routing with focus tracking
//! - [`PointerTracker`] - raw input to normalized gestures
//! - [`SurfaceSwitch`] - software pre-render, then accelerated surface
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ember_platform::{QueueDispatcher, SoftwareSurface};
//! use ember_runtime::RootContainer;
//!
//! let dispatcher = Arc::new(QueueDispatcher::new());
//! let root = RootContainer::headless(dispatcher.clone());
//! let surface = Arc::new(SoftwareSurface::new(64, 64));
//! root.attach_surface(surface.clone());
//!
//! // Host loop: run UI work, then paint when asked
//! dispatcher.drain();
//! assert!(surface.take_paint_request());
//! surface.paint();
//! assert_eq!(root.scheduler().frame_count(), 1);
//! ```

pub mod chains;
pub mod config;
pub mod deferred;
pub mod disposal;
pub mod error;
pub mod gestures;
pub mod pointer;
pub mod root;
pub mod scheduler;
pub mod surface_switch;


pub use chains::TransformChains;
pub use config::{EngineConfig, RenderGate};
pub use deferred::{DeferredAction, DeferredQueue};
pub use disposal::DisposalQueue;
pub use error::{Result, RuntimeError};
pub use gestures::{DispatchOutcome, GestureDispatcher, ListenerKey};
pub use pointer::{Gestures, PointerTracker};
pub use root::{RootContainer, RootHandle, ScreenshotCallback};
pub use scheduler::FrameScheduler;
pub use surface_switch::{SurfaceSwitch, SwitchState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, RenderGate};
    pub use crate::error::{Result, RuntimeError};
    pub use crate::root::{RootContainer, RootHandle};
    pub use crate::scheduler::FrameScheduler;
    pub use ember_animation::{Animator, AnimatorId, SpringAnimator, TweenAnimator};
    pub use ember_core::prelude::*;
    pub use ember_platform::prelude::*;
}

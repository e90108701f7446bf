//! Ember Platform Abstraction Layer
//!
//! This crate provides the platform-facing contracts the frame engine is
//! driven through.
//!
//! # Architecture
//!
//! - [`SurfaceProvider`] - A drawing surface that invokes the engine's draw
//!   handler; implemented by [`SoftwareSurface`] and [`AcceleratedSurface`]
//! - [`UiDispatcher`] - The UI-affine execution context (post / post_delayed)
//! - [`InputEvent`] - Raw pointer input forwarded by the platform
//! - [`DisplayMetrics`] - Density and safe-area insets
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ember_core::{Canvas, Color, Rect};
//! use ember_platform::{SoftwareSurface, SurfaceProvider};
//!
//! let surface = SoftwareSurface::new(8, 8);
//! surface.set_draw_handler(Some(Arc::new(|canvas: &mut dyn Canvas, bounds: Rect| {
//!     canvas.fill_rect(bounds, Color::RED);
//!     false
//! })));
//! surface.request_paint();
//! assert!(!surface.paint_if_requested());
//! assert_eq!(surface.snapshot().unwrap().pixel(0, 0), Some([255, 0, 0, 255]));
//! ```

mod dispatcher;
mod error;
mod input;
mod metrics;
pub mod surface;

// Re-export all public types
pub use dispatcher::{QueueDispatcher, Task, UiDispatcher};
pub use error::{PlatformError, Result};
pub use input::{InputEvent, InputMethod, MouseButton, MouseEvent, NoInputMethod, TouchEvent};
pub use metrics::DisplayMetrics;
pub use surface::{
    AcceleratedSurface, DrawFinished, DrawHandler, FpsCounter, RenderTarget, SoftwareSurface,
    SurfaceKind, SurfaceProvider, WakeCallback,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dispatcher::{QueueDispatcher, UiDispatcher};
    pub use crate::error::{PlatformError, Result};
    pub use crate::input::{InputEvent, InputMethod, MouseButton, MouseEvent, TouchEvent};
    pub use crate::metrics::DisplayMetrics;
    pub use crate::surface::{AcceleratedSurface, SoftwareSurface, SurfaceKind, SurfaceProvider};
}

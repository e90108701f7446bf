//! Ember Core
//!
//! Foundational types for the ember frame engine:
//!
//! - **Geometry**: points, sizes, rects, insets, affine transforms, colors
//! - **Scene Nodes**: the [`SceneNode`] contract the engine renders
//! - **Capabilities**: [`HitTestable`], [`FocusObservable`], [`GestureListener`]
//! - **Canvas**: the [`Canvas`] drawing target and the CPU [`PixelCanvas`]
//! - **Frame Context**: per-frame value object handed to nodes
//! - **Transform Chains**: root→target accumulation for dependent effects
//!
//! # Example
//!
//! ```rust
//! use ember_core::{Canvas, Color, PixelCanvas, Rect};
//!
//! let mut canvas = PixelCanvas::new(4, 4);
//! canvas.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::RED);
//! let snapshot = canvas.snapshot().unwrap();
//! assert_eq!(snapshot.pixel(1, 1), Some([255, 0, 0, 255]));
//! ```

pub mod canvas;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod node;
pub mod transform;

pub use canvas::{Canvas, PixelCanvas, Snapshot};
pub use error::{Result, SceneError};
pub use frame::FrameContext;
pub use geometry::{Affine2D, Color, Insets, Point, Rect, Size};
pub use gesture::{
    Consumed, FocusObservable, GestureEvent, GestureKind, GestureListener, HitTestable,
};
pub use node::{NodeId, SceneNode};
pub use transform::{VisualTransform, VisualTransformChain};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::canvas::{Canvas, PixelCanvas, Snapshot};
    pub use crate::frame::FrameContext;
    pub use crate::geometry::{Affine2D, Color, Insets, Point, Rect, Size};
    pub use crate::gesture::{
        Consumed, FocusObservable, GestureEvent, GestureKind, GestureListener, HitTestable,
    };
    pub use crate::node::{NodeId, SceneNode};
}

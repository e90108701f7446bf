//! Drawing surface contract
//!
//! A surface owns a backing canvas and invokes the engine's draw handler
//! when it paints. Two interchangeable variants exist:
//!
//! - [`SoftwareSurface`]: CPU canvas, painted when the platform calls
//!   [`SoftwareSurface::paint`] after a repaint request
//! - [`AcceleratedSurface`]: render-target backed, pushed explicitly through
//!   [`AcceleratedSurface::update`]
//!
//! The frame scheduler only sees the [`SurfaceProvider`] trait.

mod accelerated;
mod software;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ember_core::{Canvas, Rect};

use crate::error::Result;

pub use accelerated::{AcceleratedSurface, RenderTarget};
pub use software::SoftwareSurface;

/// Draw delegate installed by the engine
///
/// Receives the surface canvas and its pixel bounds; returns true when the
/// frame left the scene dirty and another paint should follow.
pub type DrawHandler = Arc<dyn Fn(&mut dyn Canvas, Rect) -> bool + Send + Sync>;

/// Callback used to wake the platform's paint loop from any thread
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// One-shot callback run on the painting thread once a draw completes
pub type DrawFinished = Box<dyn FnOnce() + Send>;

/// Surface variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Software,
    Accelerated,
}

/// Paint callback contract shared by both surface variants
pub trait SurfaceProvider: Send + Sync {
    fn kind(&self) -> SurfaceKind;

    /// Backing size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Timestamp of the last painted frame, nanoseconds
    fn frame_time(&self) -> u64;

    /// True while the draw handler is running
    fn is_drawing(&self) -> bool;

    /// Measured frames per second
    fn fps(&self) -> f32;

    /// False until a backing canvas exists
    ///
    /// Queried from inside the draw handler; must not lock the canvas.
    fn has_canvas(&self) -> bool;

    fn set_draw_handler(&self, handler: Option<DrawHandler>);

    fn draw_handler(&self) -> Option<DrawHandler>;

    /// Ask the platform to paint this surface
    fn request_paint(&self);

    /// Number of paint requests issued since creation
    fn paint_requests(&self) -> u64;

    fn is_disposed(&self) -> bool;

    /// Queue `callback` to run right after the draw in progress returns
    ///
    /// Returns false and drops the callback when nothing is drawing.
    fn run_after_draw(&self, callback: DrawFinished) -> bool;

    /// Release the backing canvas; later paints are no-ops
    fn dispose(&self) -> Result<()>;

    fn is_zero_sized(&self) -> bool {
        let (w, h) = self.size();
        w == 0 || h == 0
    }
}

/// Drawing flag plus the callbacks waiting for the current draw to end
#[derive(Default)]
pub(crate) struct DrawState {
    drawing: AtomicBool,
    after_draw: Mutex<Vec<DrawFinished>>,
}

impl DrawState {
    pub(crate) fn is_drawing(&self) -> bool {
        self.drawing.load(Ordering::Acquire)
    }

    /// False when a draw is already running
    pub(crate) fn begin(&self) -> bool {
        !self.drawing.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn end(&self) {
        let callbacks = {
            let mut after_draw = self.after_draw.lock().unwrap();
            self.drawing.store(false, Ordering::Release);
            std::mem::take(&mut *after_draw)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn run_after(&self, callback: DrawFinished) -> bool {
        let mut after_draw = self.after_draw.lock().unwrap();
        if !self.drawing.load(Ordering::Acquire) {
            return false;
        }
        after_draw.push(callback);
        true
    }
}

/// Exponential moving average of frame rate
#[derive(Clone, Copy, Debug)]
pub struct FpsCounter {
    alpha: f32,
    value: f32,
    last_nanos: Option<u64>,
}

impl FpsCounter {
    /// `alpha` is the EMA weight of the newest sample (0.0..=1.0)
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.01, 1.0),
            value: 0.0,
            last_nanos: None,
        }
    }

    /// Record a frame presented at `now_nanos`
    pub fn tick(&mut self, now_nanos: u64) {
        if let Some(last) = self.last_nanos {
            let dt = now_nanos.saturating_sub(last);
            if dt > 0 {
                let sample = 1_000_000_000.0 / dt as f32;
                self.value = if self.value == 0.0 {
                    sample
                } else {
                    self.alpha * sample + (1.0 - self.alpha) * self.value
                };
            }
        }
        self.last_nanos = Some(now_nanos);
    }

    pub fn fps(&self) -> f32 {
        self.value
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(0.1)
    }
}

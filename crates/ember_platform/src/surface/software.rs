//! CPU-backed surface

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, TryLockError};
use std::time::Instant;

use ember_core::{Canvas, PixelCanvas, Rect, Snapshot};

use super::{
    DrawFinished, DrawHandler, DrawState, FpsCounter, SurfaceKind, SurfaceProvider, WakeCallback,
};
use crate::error::{PlatformError, Result};

/// Software surface painting into a [`PixelCanvas`]
///
/// `request_paint` only flags the surface and wakes the platform loop; the
/// loop then calls [`SoftwareSurface::paint`] (or `paint_if_requested`) from
/// whatever thread owns presentation.
pub struct SoftwareSurface {
    canvas: Mutex<Option<PixelCanvas>>,
    width: AtomicU32,
    height: AtomicU32,
    handler: RwLock<Option<DrawHandler>>,
    wake: Option<WakeCallback>,
    paint_requested: AtomicBool,
    paint_requests: AtomicU64,
    draw: DrawState,
    has_canvas: AtomicBool,
    disposed: AtomicBool,
    frame_time: AtomicU64,
    fps: Mutex<FpsCounter>,
    epoch: Instant,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Mutex::new(Some(PixelCanvas::new(width, height))),
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            handler: RwLock::new(None),
            wake: None,
            paint_requested: AtomicBool::new(false),
            paint_requests: AtomicU64::new(0),
            draw: DrawState::default(),
            has_canvas: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            frame_time: AtomicU64::new(0),
            fps: Mutex::new(FpsCounter::default()),
            epoch: Instant::now(),
        }
    }

    /// Set a callback that wakes the platform loop on `request_paint`
    pub fn with_wake_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake = Some(std::sync::Arc::new(callback));
        self
    }

    /// Resize the backing canvas (contents are discarded)
    pub fn resize(&self, width: u32, height: u32) {
        if let Some(canvas) = self.canvas.lock().unwrap().as_mut() {
            canvas.resize(width, height);
        }
        self.width.store(width, Ordering::Release);
        self.height.store(height, Ordering::Release);
    }

    /// Check and clear the pending paint request
    pub fn take_paint_request(&self) -> bool {
        self.paint_requested.swap(false, Ordering::AcqRel)
    }

    /// Paint only when a request is pending
    pub fn paint_if_requested(&self) -> bool {
        self.take_paint_request() && self.paint()
    }

    /// Run the draw handler on the backing canvas
    ///
    /// Returns the handler's "continue dirty" result; false when disposed,
    /// already drawing, zero-sized or without a handler.
    pub fn paint(&self) -> bool {
        if self.disposed.load(Ordering::Acquire) || self.is_zero_sized() {
            return false;
        }
        let Some(handler) = self.draw_handler() else {
            return false;
        };
        if !self.draw.begin() {
            tracing::trace!("SoftwareSurface::paint re-entered, skipping");
            return false;
        }

        let now = self.epoch.elapsed().as_nanos() as u64;
        let result = {
            let mut guard = self.canvas.lock().unwrap();
            let dirty = match guard.as_mut() {
                Some(canvas) => {
                    canvas.reset_state();
                    let (w, h) = canvas.size();
                    handler(canvas as &mut dyn Canvas, Rect::new(0.0, 0.0, w as f32, h as f32))
                }
                None => false,
            };
            // Disposed from inside the handler; the canvas could not be taken then
            if self.disposed.load(Ordering::Acquire) {
                guard.take();
            }
            dirty
        };

        self.frame_time.store(now, Ordering::Release);
        self.fps.lock().unwrap().tick(now);
        self.draw.end();
        result
    }

    /// Copy of the last painted pixels
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.canvas.lock().unwrap().as_ref().and_then(|c| c.snapshot())
    }
}

impl SurfaceProvider for SoftwareSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Software
    }

    fn size(&self) -> (u32, u32) {
        (
            self.width.load(Ordering::Acquire),
            self.height.load(Ordering::Acquire),
        )
    }

    fn frame_time(&self) -> u64 {
        self.frame_time.load(Ordering::Acquire)
    }

    fn is_drawing(&self) -> bool {
        self.draw.is_drawing()
    }

    fn fps(&self) -> f32 {
        self.fps.lock().unwrap().fps()
    }

    fn has_canvas(&self) -> bool {
        self.has_canvas.load(Ordering::Acquire)
    }

    fn set_draw_handler(&self, handler: Option<DrawHandler>) {
        *self.handler.write().unwrap() = handler;
    }

    fn draw_handler(&self) -> Option<DrawHandler> {
        self.handler.read().unwrap().clone()
    }

    fn request_paint(&self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        self.paint_requested.store(true, Ordering::Release);
        self.paint_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(wake) = &self.wake {
            wake();
        }
    }

    fn paint_requests(&self) -> u64 {
        self.paint_requests.load(Ordering::Relaxed)
    }

    fn run_after_draw(&self, callback: DrawFinished) -> bool {
        self.draw.run_after(callback)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.set_draw_handler(None);
        self.has_canvas.store(false, Ordering::Release);
        let released = match self.canvas.try_lock() {
            Ok(mut canvas) => canvas.take().is_some(),
            // Mid-paint; `paint` drops the canvas once the handler returns
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(e)) => {
                return Err(PlatformError::Teardown(format!(
                    "software canvas lock poisoned: {}",
                    e
                )))
            }
        };
        tracing::debug!("SoftwareSurface disposed (released canvas now: {})", released);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Color;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_paint_runs_handler_with_pixel_bounds() {
        let surface = SoftwareSurface::new(4, 3);
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        surface.set_draw_handler(Some(Arc::new(move |canvas: &mut dyn Canvas, bounds: Rect| {
            canvas.fill_rect(bounds, Color::BLUE);
            *s.lock().unwrap() = Some(bounds);
            false
        })));

        assert!(!surface.paint());
        assert_eq!(*seen.lock().unwrap(), Some(Rect::new(0.0, 0.0, 4.0, 3.0)));
        assert_eq!(surface.snapshot().unwrap().pixel(3, 2), Some([0, 0, 255, 255]));
        assert!(!surface.is_drawing());
    }

    #[test]
    fn test_request_paint_wakes_and_counts() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let w = Arc::clone(&wakes);
        let surface = SoftwareSurface::new(1, 1).with_wake_callback(move || {
            w.fetch_add(1, Ordering::SeqCst);
        });

        surface.request_paint();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert_eq!(surface.paint_requests(), 1);
        assert!(surface.take_paint_request());
        assert!(!surface.take_paint_request());
    }

    #[test]
    fn test_dispose_is_idempotent_and_stops_painting() {
        let surface = SoftwareSurface::new(2, 2);
        surface.set_draw_handler(Some(Arc::new(|_: &mut dyn Canvas, _: Rect| true)));
        surface.dispose().unwrap();
        surface.dispose().unwrap();

        assert!(surface.is_disposed());
        assert!(!surface.has_canvas());
        assert!(!surface.paint());
        surface.request_paint();
        assert_eq!(surface.paint_requests(), 0);
    }

    #[test]
    fn test_queries_from_inside_the_draw_handler_do_not_block() {
        let surface = Arc::new(SoftwareSurface::new(2, 2));
        let weak = Arc::downgrade(&surface);
        surface.set_draw_handler(Some(Arc::new(move |_: &mut dyn Canvas, _: Rect| {
            weak.upgrade()
                .is_some_and(|s| s.has_canvas() && s.is_drawing() && !s.is_zero_sized())
        })));

        let (tx, rx) = std::sync::mpsc::channel();
        let painter = Arc::clone(&surface);
        std::thread::spawn(move || {
            let _ = tx.send(painter.paint());
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }

    #[test]
    fn test_after_draw_callback_runs_once_paint_returns() {
        let surface = Arc::new(SoftwareSurface::new(2, 2));
        let observed = Arc::new(Mutex::new(None));
        let weak = Arc::downgrade(&surface);
        let sink = observed.clone();
        surface.set_draw_handler(Some(Arc::new(move |_: &mut dyn Canvas, _: Rect| {
            let Some(s) = weak.upgrade() else {
                return false;
            };
            let after = Arc::downgrade(&s);
            let sink = sink.clone();
            s.run_after_draw(Box::new(move || {
                *sink.lock().unwrap() = after.upgrade().map(|s| s.is_drawing());
            }))
        })));

        assert!(surface.paint());
        assert_eq!(*observed.lock().unwrap(), Some(false));
        assert!(!surface.run_after_draw(Box::new(|| {})));
    }

    #[test]
    fn test_dispose_from_inside_the_handler_releases_after_paint() {
        let surface = Arc::new(SoftwareSurface::new(2, 2));
        let weak = Arc::downgrade(&surface);
        surface.set_draw_handler(Some(Arc::new(move |_: &mut dyn Canvas, _: Rect| {
            weak.upgrade().is_some_and(|s| s.dispose().is_ok())
        })));

        let (tx, rx) = std::sync::mpsc::channel();
        let painter = Arc::clone(&surface);
        std::thread::spawn(move || {
            let _ = tx.send(painter.paint());
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        assert!(surface.is_disposed());
        assert!(surface.snapshot().is_none());
    }
}

//! Render-target backed surface driven by explicit pushes

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, TryLockError};

use ember_core::{Canvas, PixelCanvas, Rect};

use super::{
    DrawFinished, DrawHandler, DrawState, FpsCounter, SurfaceKind, SurfaceProvider, WakeCallback,
};
use crate::error::{PlatformError, Result};

/// Backing target of an accelerated surface
///
/// GPU adapters implement this over their swapchain; [`PixelCanvas`]
/// implements it for headless rendering.
pub trait RenderTarget: Send {
    /// Current backing size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Canvas to record the frame into
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Submit the recorded frame
    fn present(&mut self) -> Result<()>;

    /// Free GPU resources
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RenderTarget for PixelCanvas {
    fn size(&self) -> (u32, u32) {
        Canvas::size(self)
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        self.reset_state();
        self
    }

    fn present(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accelerated surface
///
/// Unlike the software variant, frames are pushed by calling
/// [`AcceleratedSurface::update`] with the frame time, usually from the
/// render thread woken by `request_paint`.
pub struct AcceleratedSurface<T: RenderTarget> {
    target: Mutex<Option<T>>,
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
}

impl<T: RenderTarget> AcceleratedSurface<T> {
    pub fn new(target: T) -> Self {
        let (width, height) = target.size();
        Self {
            target: Mutex::new(Some(target)),
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
        }
    }

    /// Set a callback that wakes the render thread on `request_paint`
    pub fn with_wake_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake = Some(std::sync::Arc::new(callback));
        self
    }

    /// Re-read the target size after the platform resized it
    pub fn sync_size(&self) {
        if let Some(target) = self.target.lock().unwrap().as_ref() {
            let (w, h) = target.size();
            self.width.store(w, Ordering::Release);
            self.height.store(h, Ordering::Release);
        }
    }

    /// Check and clear the pending paint request
    pub fn take_paint_request(&self) -> bool {
        self.paint_requested.swap(false, Ordering::AcqRel)
    }

    /// Render one frame at `frame_time_nanos`
    ///
    /// No-op returning false on a disposed or zero-sized target.
    pub fn update(&self, frame_time_nanos: u64) -> bool {
        if self.disposed.load(Ordering::Acquire) || self.is_zero_sized() {
            return false;
        }
        let Some(handler) = self.draw_handler() else {
            return false;
        };
        if !self.draw.begin() {
            return false;
        }

        let result = {
            let mut guard = self.target.lock().unwrap();
            let dirty = match guard.as_mut() {
                Some(target) => {
                    let (w, h) = target.size();
                    if w == 0 || h == 0 {
                        false
                    } else {
                        let dirty = handler(target.canvas(), Rect::new(0.0, 0.0, w as f32, h as f32));
                        if let Err(e) = target.present() {
                            tracing::warn!("AcceleratedSurface present failed: {}", e);
                        }
                        dirty
                    }
                }
                None => false,
            };
            // Disposed from inside the handler; the target could not be taken then
            if self.disposed.load(Ordering::Acquire) {
                if let Some(Err(e)) = guard.take().map(|mut target| target.release()) {
                    tracing::warn!("AcceleratedSurface release failed: {}", e);
                }
            }
            dirty
        };

        self.frame_time.store(frame_time_nanos, Ordering::Release);
        self.fps.lock().unwrap().tick(frame_time_nanos);
        self.draw.end();
        result
    }

    /// Run a closure against the render target (readback, resize)
    pub fn with_target<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.target.lock().unwrap().as_mut().map(f)
    }
}

impl<T: RenderTarget> SurfaceProvider for AcceleratedSurface<T> {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Accelerated
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
        let target = match self.target.try_lock() {
            Ok(mut target) => target.take(),
            // Mid-update; `update` releases the target once the handler returns
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(e)) => {
                return Err(PlatformError::Teardown(format!(
                    "render target lock poisoned: {}",
                    e
                )))
            }
        };
        match target {
            Some(mut target) => target.release(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Color;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_update_pushes_frame_with_given_time() {
        let surface = AcceleratedSurface::new(PixelCanvas::new(2, 2));
        surface.set_draw_handler(Some(Arc::new(|canvas: &mut dyn Canvas, bounds: Rect| {
            canvas.fill_rect(bounds, Color::GREEN);
            true
        })));

        assert!(surface.update(5_000));
        assert_eq!(surface.frame_time(), 5_000);
        let pixel = surface.with_target(|t| t.snapshot().unwrap().pixel(0, 0)).flatten();
        assert_eq!(pixel, Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_update_is_noop_on_zero_sized_target() {
        let surface = AcceleratedSurface::new(PixelCanvas::new(0, 0));
        surface.set_draw_handler(Some(Arc::new(|_: &mut dyn Canvas, _: Rect| {
            panic!("handler must not run on a zero-sized target")
        })));

        assert!(!surface.update(1));
        assert!(surface.is_zero_sized());
        assert_eq!(surface.frame_time(), 0);
    }

    #[test]
    fn test_has_canvas_is_queryable_during_update() {
        let surface = Arc::new(AcceleratedSurface::new(PixelCanvas::new(2, 2)));
        let weak = Arc::downgrade(&surface);
        surface.set_draw_handler(Some(Arc::new(move |_: &mut dyn Canvas, _: Rect| {
            weak.upgrade().is_some_and(|s| s.has_canvas())
        })));

        let (tx, rx) = std::sync::mpsc::channel();
        let pusher = Arc::clone(&surface);
        std::thread::spawn(move || {
            let _ = tx.send(pusher.update(1));
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));

        surface.dispose().unwrap();
        assert!(!surface.has_canvas());
    }
}

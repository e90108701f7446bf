//! Frame scheduler / invalidation controller
//!
//! Decides when a repaint is requested from the active surface.
//!
//! Flags (all atomics so the paint callback may run on another thread):
//!
//! - `dirty`: output is stale; cleared when a frame starts, re-raised by
//!   anything invalidating during the frame
//! - `pending`: a repaint was requested and has not started yet; further
//!   `update()` calls coalesce into it
//! - `busy`: the repaint request is being issued on the UI context; a second
//!   request only raises `need_redraw` (single-slot backpressure)
//! - `rendering`: between `on_start_rendering` and `on_finalize_rendering`
//!
//! The only re-entry point that keeps animation going is
//! [`FrameScheduler::on_finalize_rendering`] calling `update()` when the frame
//! left the scene dirty. A request issued while the surface is still drawing
//! is parked on the surface's after-draw callback.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

use ember_platform::{FpsCounter, SurfaceProvider, UiDispatcher};
use tokio::sync::oneshot;

use crate::config::{EngineConfig, RenderGate};
use crate::error::{Result, RuntimeError};

/// Smallest pacing delay worth sleeping for; below it the request just
/// yields one dispatcher tick
const MIN_PACING_SLACK: Duration = Duration::from_millis(1);

/// Invalidation state machine for one root
pub struct FrameScheduler {
    this: Weak<FrameScheduler>,
    surface: RwLock<Option<Arc<dyn SurfaceProvider>>>,
    dispatcher: Arc<dyn UiDispatcher>,
    gate: Arc<RenderGate>,

    frame_budget: Option<Duration>,
    zero_size_retry: Duration,
    continuous: AtomicBool,

    dirty: AtomicBool,
    pending: AtomicBool,
    busy: AtomicBool,
    need_redraw: AtomicBool,
    rendering: AtomicBool,
    retry_scheduled: AtomicBool,
    visible: AtomicBool,
    disposed: AtomicBool,

    epoch: Instant,
    frame_started: AtomicU64,
    frame_finished: AtomicU64,
    frames: AtomicU64,
    fps: Mutex<FpsCounter>,
    frame_waiters: Mutex<Vec<oneshot::Sender<u64>>>,
}

impl FrameScheduler {
    pub fn new(
        config: &EngineConfig,
        dispatcher: Arc<dyn UiDispatcher>,
        gate: Arc<RenderGate>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            surface: RwLock::new(None),
            dispatcher,
            gate,
            frame_budget: config.frame_budget(),
            zero_size_retry: config.zero_size_retry(),
            continuous: AtomicBool::new(config.continuous_updates),
            dirty: AtomicBool::new(true),
            pending: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            need_redraw: AtomicBool::new(false),
            rendering: AtomicBool::new(false),
            retry_scheduled: AtomicBool::new(false),
            visible: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            epoch: Instant::now(),
            frame_started: AtomicU64::new(0),
            frame_finished: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            fps: Mutex::new(FpsCounter::new(config.fps_smoothing)),
            frame_waiters: Mutex::new(Vec::new()),
        })
    }

    // =========================================================================
    // Surface slot
    // =========================================================================

    pub fn surface(&self) -> Option<Arc<dyn SurfaceProvider>> {
        self.surface.read().unwrap().clone()
    }

    /// Install `surface` as the active one, returning the previous surface
    pub fn replace_surface(
        &self,
        surface: Option<Arc<dyn SurfaceProvider>>,
    ) -> Option<Arc<dyn SurfaceProvider>> {
        std::mem::replace(&mut *self.surface.write().unwrap(), surface)
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Mark the output stale and request a repaint when possible
    pub fn update(&self) {
        self.dirty.store(true, Ordering::Release);

        if self.disposed.load(Ordering::Acquire)
            || !self.gate.is_enabled()
            || !self.visible.load(Ordering::Acquire)
        {
            return;
        }
        let Some(surface) = self.surface() else {
            return;
        };
        if surface.is_disposed() {
            return;
        }
        if surface.is_zero_sized() {
            self.schedule_zero_size_retry();
            return;
        }
        if self.rendering.load(Ordering::Acquire) {
            // Finalize re-issues the update
            return;
        }
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("FrameScheduler: update coalesced into pending frame");
            return;
        }
        self.invalidate_canvas();
    }

    /// Issue a repaint request on the UI context, paced to the frame budget
    pub fn invalidate_canvas(&self) {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.need_redraw.store(true, Ordering::Release);
            // The follow-up update must not coalesce into this request
            self.pending.store(false, Ordering::Release);
            tracing::trace!("FrameScheduler: busy, deferring redraw");
            return;
        }

        self.post_repaint(self.pacing_delay());
    }

    fn post_repaint(&self, delay: Duration) {
        let this = self.this.clone();
        self.dispatcher.post_delayed(
            delay,
            Box::new(move || {
                if let Some(scheduler) = this.upgrade() {
                    scheduler.issue_repaint();
                }
            }),
        );
    }

    fn pacing_delay(&self) -> Duration {
        let Some(budget) = self.frame_budget else {
            return Duration::ZERO;
        };
        let last = self.frame_started.load(Ordering::Acquire);
        if last == 0 {
            return Duration::ZERO;
        }
        let elapsed = Duration::from_nanos(self.now_nanos().saturating_sub(last));
        match budget.checked_sub(elapsed) {
            Some(slack) if slack >= MIN_PACING_SLACK => slack,
            _ => Duration::ZERO,
        }
    }

    fn issue_repaint(&self) {
        let surface = match self.surface() {
            Some(surface) if !self.disposed.load(Ordering::Acquire) => surface,
            _ => {
                self.busy.store(false, Ordering::Release);
                self.pending.store(false, Ordering::Release);
                return;
            }
        };

        if surface.is_drawing() {
            let this = self.this.clone();
            let queued = surface.run_after_draw(Box::new(move || {
                if let Some(scheduler) = this.upgrade() {
                    scheduler.post_repaint(Duration::ZERO);
                }
            }));
            if queued {
                tracing::trace!("FrameScheduler: surface drawing, repaint follows the draw");
                return;
            }
        }

        surface.request_paint();
        self.busy.store(false, Ordering::Release);

        if self.need_redraw.swap(false, Ordering::AcqRel) {
            self.post_update();
        }
    }

    fn post_update(&self) {
        let this = self.this.clone();
        self.dispatcher.post(Box::new(move || {
            if let Some(scheduler) = this.upgrade() {
                scheduler.update();
            }
        }));
    }

    fn schedule_zero_size_retry(&self) {
        if self.retry_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(
            "FrameScheduler: surface has no area, retrying in {:?}",
            self.zero_size_retry
        );
        let this = self.this.clone();
        self.dispatcher.post_delayed(
            self.zero_size_retry,
            Box::new(move || {
                if let Some(scheduler) = this.upgrade() {
                    scheduler.retry_scheduled.store(false, Ordering::Release);
                    // No paint can start on an empty surface, so any pending
                    // request is stale
                    scheduler.pending.store(false, Ordering::Release);
                    scheduler.update();
                }
            }),
        );
    }

    // =========================================================================
    // Frame boundaries (called from the paint callback)
    // =========================================================================

    /// Begin a frame; false means skip drawing
    pub fn on_start_rendering(&self) -> bool {
        let usable = !self.disposed.load(Ordering::Acquire)
            && self
                .surface()
                .is_some_and(|s| !s.is_disposed() && s.has_canvas() && !s.is_zero_sized());
        // Either way the outstanding request has been consumed
        self.pending.store(false, Ordering::Release);
        if !usable {
            return false;
        }

        self.frame_started.store(self.now_nanos(), Ordering::Release);
        self.rendering.store(true, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        true
    }

    /// End a frame; re-issues `update()` when the frame left things dirty
    pub fn on_finalize_rendering(&self) {
        let now = self.now_nanos();
        self.frame_finished.store(now, Ordering::Release);
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.fps.lock().unwrap().tick(now);
        self.rendering.store(false, Ordering::Release);

        if self.continuous.load(Ordering::Acquire) {
            self.dirty.store(true, Ordering::Release);
        }

        let waiters = std::mem::take(&mut *self.frame_waiters.lock().unwrap());
        for waiter in waiters {
            let _ = waiter.send(now);
        }

        if self.dirty.load(Ordering::Acquire) {
            self.update();
        }
    }

    /// Resolves with the frame timestamp once the next frame finalizes
    ///
    /// Also requests that frame. Fails with [`RuntimeError::SignalDropped`]
    /// if the scheduler is disposed first.
    pub fn next_frame(&self) -> impl Future<Output = Result<u64>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        if !self.disposed.load(Ordering::Acquire) {
            self.frame_waiters.lock().unwrap().push(tx);
            self.update();
        }
        async move {
            rx.await
                .map_err(|e| RuntimeError::SignalDropped(format!("next frame: {}", e)))
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Monotonic nanoseconds since the scheduler was created (never 0)
    pub fn now_nanos(&self) -> u64 {
        (self.epoch.elapsed().as_nanos() as u64).max(1)
    }

    /// Timestamp of the frame being drawn, or of the last one
    pub fn frame_time_nanos(&self) -> u64 {
        self.frame_started.load(Ordering::Acquire)
    }

    pub fn last_frame_finished_nanos(&self) -> u64 {
        self.frame_finished.load(Ordering::Acquire)
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Moving-average frame rate of finalized frames
    pub fn fps(&self) -> f32 {
        self.fps.lock().unwrap().fps()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Raise dirty without requesting a repaint
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    pub fn set_continuous_updates(&self, enabled: bool) {
        self.continuous.store(enabled, Ordering::Release);
        if enabled {
            self.update();
        }
    }

    /// Hidden roots keep their dirty flag but request nothing
    pub fn set_visible(&self, visible: bool) {
        let was = self.visible.swap(visible, Ordering::AcqRel);
        if visible && !was && self.is_dirty() {
            self.update();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Stop scheduling and release the active surface
    ///
    /// Teardown errors are logged; disposal always completes.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.frame_waiters.lock().unwrap().clear();
        if let Some(surface) = self.replace_surface(None) {
            surface.set_draw_handler(None);
            if let Err(e) = surface.dispose() {
                tracing::warn!("FrameScheduler: surface teardown failed: {}", e);
            }
        }
    }
}

//! Root container
//!
//! The single-child entry node of a visual tree. It owns the frame
//! scheduler, the animator registries, the gesture dispatcher and the
//! deferred queues, and its [`RootContainer::paint`] is the draw handler
//! installed on the active surface.
//!
//! Per-frame composition order:
//!
//! 1. drain the before-draw queue, then apply queued animator inserts
//! 2. reset transform chains
//! 3. tick main animators
//! 4. remeasure if needed, `on_before_draw`, render the child
//! 5. tick and render overlay animators
//! 6. deliver a pending screenshot
//! 7. drain the after-draw queue
//! 8. dispose nodes whose disposal delay expired
//!
//! Any animator executing in steps 3 or 5 keeps frames coming.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

use ember_animation::{Animator, AnimatorId, AnimatorRegistry};
use ember_core::{
    Canvas, Color, FrameContext, GestureEvent, GestureKind, GestureListener, NodeId, Rect,
    SceneError, SceneNode, Size, Snapshot, VisualTransform, VisualTransformChain,
};
use ember_platform::{
    DisplayMetrics, InputEvent, InputMethod, NoInputMethod, SurfaceProvider, UiDispatcher,
};
use tokio::sync::oneshot;

use crate::chains::TransformChains;
use crate::config::{EngineConfig, RenderGate};
use crate::deferred::{panic_message, DeferredAction, DeferredQueue};
use crate::disposal::DisposalQueue;
use crate::error::{Result, RuntimeError};
use crate::gestures::{GestureDispatcher, ListenerKey};
use crate::pointer::PointerTracker;
use crate::scheduler::FrameScheduler;
use crate::surface_switch::{SurfaceSwitch, SwitchState};

/// One-shot screenshot consumer
pub type ScreenshotCallback = Box<dyn FnOnce(Snapshot) + Send + 'static>;

/// Entry node owning the frame pipeline of one surface
pub struct RootContainer {
    id: NodeId,
    this: Weak<RootContainer>,
    config: EngineConfig,
    scheduler: Arc<FrameScheduler>,
    dispatcher: Arc<dyn UiDispatcher>,

    child: RwLock<Option<Arc<dyn SceneNode>>>,
    metrics: RwLock<DisplayMetrics>,
    fill: AtomicBool,
    visible: AtomicBool,
    needs_remeasure: AtomicBool,
    measured: Mutex<Size>,
    disposed: AtomicBool,

    animators: AnimatorRegistry,
    overlay_animators: AnimatorRegistry,
    gestures: GestureDispatcher,
    pointer: Mutex<PointerTracker>,
    /// Gestures waiting for the next before-draw pass
    pending_gestures: Mutex<Vec<GestureEvent>>,
    chains: TransformChains,
    before_draw: DeferredQueue,
    after_draw: DeferredQueue,
    disposals: DisposalQueue,

    screenshot: Mutex<Option<ScreenshotCallback>>,
    capture_waiters: Mutex<Vec<oneshot::Sender<Snapshot>>>,
    switch: Mutex<Option<Arc<SurfaceSwitch>>>,
}

impl RootContainer {
    pub fn new(
        config: EngineConfig,
        dispatcher: Arc<dyn UiDispatcher>,
        gate: Arc<RenderGate>,
        input_method: Arc<dyn InputMethod>,
    ) -> Arc<Self> {
        let scheduler = FrameScheduler::new(&config, Arc::clone(&dispatcher), gate);
        let metrics = DisplayMetrics::default();
        let pointer = PointerTracker::new(
            config.pan_threshold,
            config.tap_timeout().as_nanos() as u64,
            metrics.density,
        );
        Arc::new_cyclic(|this| Self {
            id: NodeId::next(),
            this: this.clone(),
            config,
            scheduler,
            dispatcher,
            child: RwLock::new(None),
            metrics: RwLock::new(metrics),
            fill: AtomicBool::new(true),
            visible: AtomicBool::new(true),
            needs_remeasure: AtomicBool::new(true),
            measured: Mutex::new(Size::ZERO),
            disposed: AtomicBool::new(false),
            animators: AnimatorRegistry::new(),
            overlay_animators: AnimatorRegistry::new(),
            gestures: GestureDispatcher::new(input_method),
            pointer: Mutex::new(pointer),
            pending_gestures: Mutex::new(Vec::new()),
            chains: TransformChains::new(),
            before_draw: DeferredQueue::new("before-draw"),
            after_draw: DeferredQueue::new("after-draw"),
            disposals: DisposalQueue::new(),
            screenshot: Mutex::new(None),
            capture_waiters: Mutex::new(Vec::new()),
            switch: Mutex::new(None),
        })
    }

    /// Root configured from a TOML file
    pub fn from_config_file(
        path: &Path,
        dispatcher: Arc<dyn UiDispatcher>,
        gate: Arc<RenderGate>,
        input_method: Arc<dyn InputMethod>,
    ) -> Result<Arc<Self>> {
        let config = EngineConfig::load(path)?;
        Ok(Self::new(config, dispatcher, gate, input_method))
    }

    /// Root with default config, an always-on gate and no soft keyboard
    pub fn headless(dispatcher: Arc<dyn UiDispatcher>) -> Arc<Self> {
        Self::new(
            EngineConfig::default(),
            dispatcher,
            Arc::new(RenderGate::default()),
            Arc::new(NoInputMethod),
        )
    }

    /// Weak handle for scene nodes
    pub fn handle(&self) -> RootHandle {
        RootHandle {
            root: self.this.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<FrameScheduler> {
        &self.scheduler
    }

    pub fn gestures(&self) -> &GestureDispatcher {
        &self.gestures
    }

    pub fn animators(&self) -> &AnimatorRegistry {
        &self.animators
    }

    pub fn overlay_animators(&self) -> &AnimatorRegistry {
        &self.overlay_animators
    }

    pub fn transform_chains(&self) -> &TransformChains {
        &self.chains
    }

    pub fn fps(&self) -> f32 {
        self.scheduler.fps()
    }

    // =========================================================================
    // Surfaces
    // =========================================================================

    /// Make `surface` the active surface and route its paints here
    pub fn attach_surface(&self, surface: Arc<dyn SurfaceProvider>) {
        surface.set_draw_handler(Some(self.draw_handler()));
        if let Some(previous) = self.scheduler.replace_surface(Some(surface)) {
            previous.set_draw_handler(None);
            if let Err(e) = previous.dispose() {
                tracing::warn!("RootContainer: previous surface teardown failed: {}", e);
            }
        }
        self.needs_remeasure.store(true, Ordering::Release);
        self.scheduler.update();
    }

    /// Attach both variants, pre-rendering on `software` when
    /// `prerender_frames` is configured
    pub fn attach_surfaces(
        &self,
        software: Arc<dyn SurfaceProvider>,
        accelerated: Arc<dyn SurfaceProvider>,
    ) {
        match self.config.prerender_frames {
            Some(frames) if frames > 0 => {
                let switch = SurfaceSwitch::new(accelerated, frames);
                *self.switch.lock().unwrap() = Some(Arc::new(switch));
                self.attach_surface(software);
            }
            _ => {
                if let Err(e) = software.dispose() {
                    tracing::warn!("RootContainer: unused software surface teardown failed: {}", e);
                }
                self.attach_surface(accelerated);
            }
        }
    }

    /// Pre-render progress, `None` without pre-rendering
    pub fn surface_switch_state(&self) -> Option<SwitchState> {
        self.switch.lock().unwrap().as_ref().map(|s| s.state())
    }

    fn draw_handler(&self) -> ember_platform::DrawHandler {
        let root = self.this.clone();
        Arc::new(move |canvas: &mut dyn Canvas, bounds: Rect| {
            root.upgrade()
                .map(|root| root.paint(canvas, bounds))
                .unwrap_or(false)
        })
    }

    fn complete_surface_switch(&self) {
        // Completing may paint synchronously, which re-enters the switch
        let switch = self.switch.lock().unwrap().clone();
        if let Some(switch) = switch {
            switch.complete(&self.scheduler);
        }
    }

    // =========================================================================
    // Child
    // =========================================================================

    /// Install the single child; a second child is rejected
    pub fn set_child(&self, child: Arc<dyn SceneNode>) -> std::result::Result<(), SceneError> {
        {
            let mut slot = self.child.write().unwrap();
            if let Some(existing) = slot.as_ref() {
                return Err(SceneError::ChildAlreadySet {
                    container: self.id,
                    existing: existing.id(),
                    rejected: child.id(),
                });
            }
            if child.is_disposed() {
                return Err(SceneError::Disposed(child.id()));
            }
            *slot = Some(child);
        }
        self.invalidate();
        Ok(())
    }

    pub fn remove_child(&self) -> Option<Arc<dyn SceneNode>> {
        let removed = self.child.write().unwrap().take();
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    pub fn child(&self) -> Option<Arc<dyn SceneNode>> {
        self.child.read().unwrap().clone()
    }

    /// Fill the surface (default) or auto-size to the child's content
    pub fn set_fill(&self, fill: bool) {
        self.fill.store(fill, Ordering::Release);
        self.invalidate();
    }

    /// Size from the last layout pass, pixels
    pub fn measured_size(&self) -> Size {
        *self.measured.lock().unwrap()
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    pub fn update(&self) {
        self.scheduler.update();
    }

    /// Request a remeasure and a repaint
    pub fn invalidate(&self) {
        self.needs_remeasure.store(true, Ordering::Release);
        self.scheduler.update();
    }

    pub fn set_display_metrics(&self, metrics: DisplayMetrics) {
        *self.metrics.write().unwrap() = metrics;
        self.pointer.lock().unwrap().set_density(metrics.density);
        self.invalidate();
    }

    pub fn display_metrics(&self) -> DisplayMetrics {
        *self.metrics.read().unwrap()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
        self.scheduler.set_visible(visible);
    }

    // =========================================================================
    // Animators
    // =========================================================================

    /// Start `animator` and register it before the next draw
    ///
    /// Registering an animator that is already registered does nothing.
    pub fn add_animator(&self, animator: Arc<dyn Animator>) -> bool {
        self.register_in(&self.animators, animator)
    }

    /// Like [`add_animator`](Self::add_animator), for animators drawn after
    /// the main subtree
    pub fn add_overlay_animator(&self, animator: Arc<dyn Animator>) -> bool {
        self.register_in(&self.overlay_animators, animator)
    }

    fn register_in(&self, registry: &AnimatorRegistry, animator: Arc<dyn Animator>) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let id = animator.id();
        if registry.contains(id) || registry.is_queued(id) {
            return false;
        }
        if !animator.is_running() && !animator.start() {
            return false;
        }
        let queued = registry.queue_insert(animator);
        self.scheduler.update();
        queued
    }

    pub fn remove_animator(&self, id: AnimatorId) -> bool {
        self.animators.remove(id).is_some() || self.overlay_animators.remove(id).is_some()
    }

    // =========================================================================
    // Gestures and input
    // =========================================================================

    pub fn register_gesture_listener(&self, listener: Arc<dyn GestureListener>) -> ListenerKey {
        self.gestures.register(listener)
    }

    pub fn unregister_gesture_listener(&self, node: NodeId) -> bool {
        self.gestures.unregister(node)
    }

    /// Feed raw platform input observed now
    pub fn handle_input(&self, event: &InputEvent) {
        self.handle_input_at(event, self.scheduler.now_nanos());
    }

    /// Feed raw platform input observed at `now_nanos`
    ///
    /// Gestures are dispatched right before the next frame, never inside the
    /// platform callback.
    pub fn handle_input_at(&self, event: &InputEvent, now_nanos: u64) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let gestures = self.pointer.lock().unwrap().process(event, now_nanos);
        if gestures.is_empty() {
            return;
        }
        let first = {
            let mut pending = self.pending_gestures.lock().unwrap();
            let first = pending.is_empty();
            for gesture in gestures {
                coalesce_gesture(&mut pending, gesture);
            }
            first
        };
        if first {
            let root = self.this.clone();
            self.before_draw.push(Box::new(move || {
                if let Some(root) = root.upgrade() {
                    root.dispatch_pending_gestures();
                }
            }));
        }
        self.scheduler.update();
    }

    /// Gestures buffered for the next frame
    pub fn pending_gesture_count(&self) -> usize {
        self.pending_gestures.lock().unwrap().len()
    }

    fn dispatch_pending_gestures(&self) {
        let gestures = std::mem::take(&mut *self.pending_gestures.lock().unwrap());
        for gesture in &gestures {
            self.gestures.dispatch(gesture);
        }
    }

    // =========================================================================
    // Deferred work
    // =========================================================================

    pub fn postpone_before_draw(&self, action: DeferredAction) {
        self.before_draw.push(action);
        self.scheduler.update();
    }

    pub fn postpone_after_draw(&self, action: DeferredAction) {
        self.after_draw.push(action);
        self.scheduler.update();
    }

    /// Deliver the next composed frame's pixels to `callback`, once
    ///
    /// A newer request replaces one that has not been delivered yet.
    pub fn take_screenshot(&self, callback: ScreenshotCallback) {
        *self.screenshot.lock().unwrap() = Some(callback);
        self.scheduler.update();
    }

    /// Future resolving with the next composed frame's pixels
    ///
    /// Fails with [`RuntimeError::Disposed`] on a disposed root, and with
    /// [`RuntimeError::SignalDropped`] when the root is disposed before the
    /// frame is composed.
    pub fn capture_next_frame(&self) -> impl Future<Output = Result<Snapshot>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let disposed = self.disposed.load(Ordering::Acquire);
        if !disposed {
            self.capture_waiters.lock().unwrap().push(tx);
            self.scheduler.update();
        }
        async move {
            if disposed {
                return Err(RuntimeError::Disposed);
            }
            rx.await
                .map_err(|e| RuntimeError::SignalDropped(format!("frame capture: {}", e)))
        }
    }

    /// Dispose `node` once `delay` has elapsed, after a draw
    ///
    /// Until then the node keeps its listener and animators.
    pub fn dispose_node_after(&self, node: Arc<dyn SceneNode>, delay: Duration) {
        if !self.disposals.schedule(node, delay) {
            return;
        }
        let root = self.this.clone();
        self.dispatcher.post_delayed(
            delay,
            Box::new(move || {
                if let Some(root) = root.upgrade() {
                    root.update();
                }
            }),
        );
    }

    pub fn register_transform_chain(&self, chain: VisualTransformChain) {
        self.chains.register(chain);
    }

    /// Report the transform a node applied while rendering this frame
    pub fn report_node_transform(&self, node: NodeId, transform: VisualTransform) -> usize {
        self.chains.report(node, transform)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Draw handler body: compose one frame into `canvas`
    ///
    /// Returns true when the scene is still dirty after the frame.
    pub fn paint(&self, canvas: &mut dyn Canvas, bounds: Rect) -> bool {
        if self.disposed.load(Ordering::Acquire) || !self.scheduler.on_start_rendering() {
            return false;
        }
        let frame_time = self.scheduler.frame_time_nanos();

        let composed = catch_unwind(AssertUnwindSafe(|| self.compose(canvas, bounds, frame_time)));
        if let Err(panic) = composed {
            tracing::error!(
                "RootContainer: frame at {} panicked: {}",
                frame_time,
                panic_message(panic.as_ref())
            );
            self.needs_remeasure.store(true, Ordering::Release);
            self.scheduler.mark_dirty();
        }

        self.scheduler.on_finalize_rendering();
        self.after_frame_finalized();
        self.scheduler.is_dirty()
    }

    fn compose(&self, canvas: &mut dyn Canvas, bounds: Rect, now: u64) {
        // 1
        self.before_draw.drain();
        self.animators.apply_pending();
        self.overlay_animators.apply_pending();

        // 2
        self.chains.reset_all();

        // 3
        let main = self.animators.execute(now, |_| {});

        // 4
        let metrics = self.display_metrics();
        let area = metrics.safe_bounds(bounds);
        let child = self.child();
        if let Some(child) = &child {
            if self.needs_remeasure.swap(false, Ordering::AcqRel) {
                child.on_before_measure();
                self.layout(child.as_ref(), area);
            }
            child.on_before_draw();
        }

        canvas.clear(Color::TRANSPARENT);
        let mut ctx = FrameContext::new(canvas, now, bounds, metrics.density, self.id);
        if let Some(child) = &child {
            if child.can_draw() {
                let child_bounds = if self.fill.load(Ordering::Acquire) {
                    area
                } else {
                    Rect::from_origin_size(area.origin, self.measured_size())
                };
                child.render(&mut ctx, child_bounds, metrics.density);
            }
        }

        // 5
        let overlay = self
            .overlay_animators
            .execute(now, |animator| animator.render_overlay(&mut ctx));
        if main.executed + overlay.executed > 0 {
            self.scheduler.mark_dirty();
        }

        // 6
        self.deliver_screenshot(&*ctx.canvas);
        drop(ctx);

        // 7
        self.after_draw.drain();

        // 8
        self.process_disposals(Instant::now());
    }

    fn layout(&self, child: &dyn SceneNode, area: Rect) {
        let desired = child.measure(area.width(), area.height());
        let size = if self.fill.load(Ordering::Acquire) {
            area.size
        } else {
            desired.min(area.size)
        };
        *self.measured.lock().unwrap() = size;
    }

    fn deliver_screenshot(&self, canvas: &dyn Canvas) {
        let callback = self.screenshot.lock().unwrap().take();
        let waiters = std::mem::take(&mut *self.capture_waiters.lock().unwrap());
        if callback.is_none() && waiters.is_empty() {
            return;
        }
        let Some(snapshot) = canvas.snapshot() else {
            // Nothing to capture yet; keep the requests for a later frame
            if let Some(callback) = callback {
                self.screenshot.lock().unwrap().get_or_insert(callback);
            }
            self.capture_waiters.lock().unwrap().extend(waiters);
            return;
        };
        for waiter in waiters {
            let _ = waiter.send(snapshot.clone());
        }
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }

    fn process_disposals(&self, now: Instant) {
        for node in self.disposals.take_expired(now) {
            self.release_node(node.as_ref());
        }
    }

    /// Detach every engine reference to `node`, then dispose it
    fn release_node(&self, node: &dyn SceneNode) {
        let id = node.id();
        self.gestures.unregister(id);
        self.animators.remove_by_owner(id);
        self.overlay_animators.remove_by_owner(id);
        self.chains.remove_node(id);
        {
            let mut child = self.child.write().unwrap();
            if child.as_ref().is_some_and(|c| c.id() == id) {
                *child = None;
                self.needs_remeasure.store(true, Ordering::Release);
            }
        }
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| node.dispose())) {
            tracing::warn!("RootContainer: disposing {} panicked: {}", id, panic_message(panic.as_ref()));
        }
        tracing::trace!("RootContainer: disposed {}", id);
    }

    fn after_frame_finalized(&self) {
        let switch = self.switch.lock().unwrap().clone();
        let due = switch.is_some_and(|switch| switch.record_frame());
        if due {
            // The software surface is still inside its paint callback
            let root = self.this.clone();
            self.dispatcher.post(Box::new(move || {
                if let Some(root) = root.upgrade() {
                    root.complete_surface_switch();
                }
            }));
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Tear down the pipeline; idempotent
    ///
    /// Teardown errors are logged and never abort disposal.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.scheduler.dispose();
        self.animators.clear();
        self.overlay_animators.clear();
        self.gestures.clear();
        self.before_draw.clear();
        self.after_draw.clear();
        self.pending_gestures.lock().unwrap().clear();
        self.capture_waiters.lock().unwrap().clear();
        self.screenshot.lock().unwrap().take();
        for node in self.disposals.take_all() {
            self.release_node(node.as_ref());
        }
        if let Some(child) = self.child.write().unwrap().take() {
            child.dispose();
        }
        tracing::debug!("RootContainer {} disposed", self.id);
    }
}

/// Fold consecutive moves of one pointer into a single event so input
/// arriving while no frame runs stays bounded
fn coalesce_gesture(pending: &mut Vec<GestureEvent>, gesture: GestureEvent) {
    if matches!(gesture.kind, GestureKind::Panning | GestureKind::Wheel) {
        if let Some(last) = pending.last_mut() {
            if last.kind == gesture.kind && last.pointer_id == gesture.pointer_id {
                *last = GestureEvent {
                    delta: last.delta + gesture.delta,
                    wheel_delta: last.wheel_delta + gesture.wheel_delta,
                    ..gesture
                };
                return;
            }
        }
    }
    pending.push(gesture);
}

impl SceneNode for RootContainer {
    fn id(&self) -> NodeId {
        self.id
    }

    fn render(&self, ctx: &mut FrameContext<'_>, bounds: Rect, scale: f32) {
        if let Some(child) = self.child() {
            if child.can_draw() {
                child.render(ctx, bounds, scale);
            }
        }
    }

    fn measure(&self, available_width: f32, available_height: f32) -> Size {
        let available = Size::new(available_width, available_height);
        if self.fill.load(Ordering::Acquire) {
            return available;
        }
        self.child()
            .map(|child| child.measure(available_width, available_height).min(available))
            .unwrap_or(Size::ZERO)
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        RootContainer::dispose(self);
    }
}

/// Weak handle through which scene nodes reach their root
///
/// Every call is a no-op once the root is gone.
#[derive(Clone)]
pub struct RootHandle {
    root: Weak<RootContainer>,
}

impl RootHandle {
    pub fn is_alive(&self) -> bool {
        self.root
            .upgrade()
            .is_some_and(|root| !root.disposed.load(Ordering::Acquire))
    }

    pub fn update(&self) {
        if let Some(root) = self.root.upgrade() {
            root.update();
        }
    }

    pub fn invalidate(&self) {
        if let Some(root) = self.root.upgrade() {
            root.invalidate();
        }
    }

    pub fn add_animator(&self, animator: Arc<dyn Animator>) -> bool {
        self.root
            .upgrade()
            .is_some_and(|root| root.add_animator(animator))
    }

    pub fn add_overlay_animator(&self, animator: Arc<dyn Animator>) -> bool {
        self.root
            .upgrade()
            .is_some_and(|root| root.add_overlay_animator(animator))
    }

    pub fn remove_animator(&self, id: AnimatorId) -> bool {
        self.root
            .upgrade()
            .is_some_and(|root| root.remove_animator(id))
    }

    pub fn register_gesture_listener(&self, listener: Arc<dyn GestureListener>) -> Option<ListenerKey> {
        self.root
            .upgrade()
            .map(|root| root.register_gesture_listener(listener))
    }

    pub fn unregister_gesture_listener(&self, node: NodeId) -> bool {
        self.root
            .upgrade()
            .is_some_and(|root| root.unregister_gesture_listener(node))
    }

    pub fn postpone_before_draw<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(root) = self.root.upgrade() {
            root.postpone_before_draw(Box::new(action));
        }
    }

    pub fn postpone_after_draw<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(root) = self.root.upgrade() {
            root.postpone_after_draw(Box::new(action));
        }
    }

    pub fn take_screenshot<F>(&self, callback: F)
    where
        F: FnOnce(Snapshot) + Send + 'static,
    {
        if let Some(root) = self.root.upgrade() {
            root.take_screenshot(Box::new(callback));
        }
    }

    pub fn dispose_node_after(&self, node: Arc<dyn SceneNode>, delay: Duration) {
        if let Some(root) = self.root.upgrade() {
            root.dispose_node_after(node, delay);
        }
    }

    pub fn report_node_transform(&self, node: NodeId, transform: VisualTransform) -> usize {
        self.root
            .upgrade()
            .map(|root| root.report_node_transform(node, transform))
            .unwrap_or(0)
    }
}

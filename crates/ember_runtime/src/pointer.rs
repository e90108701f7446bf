//! Raw pointer input → normalized gesture events
//!
//! Mouse buttons and touches are tracked uniformly as pointers. Panning is
//! only reported once a pointer has moved past the jitter threshold
//! (`pan_threshold` points scaled by display density); until then small
//! movements are swallowed so a tap is not mistaken for a drag.

use ember_core::{GestureEvent, GestureKind, Point};
use ember_platform::{InputEvent, MouseEvent, TouchEvent};
use smallvec::SmallVec;

/// Gestures produced by one raw input event
pub type Gestures = SmallVec<[GestureEvent; 2]>;

/// Pointer id used for the mouse
const MOUSE_POINTER: u64 = u64::MAX;

#[derive(Clone, Copy, Debug)]
struct TrackedPointer {
    id: u64,
    start: Point,
    last: Point,
    last_nanos: u64,
    velocity: Point,
}

/// Per-root pointer state machine
#[derive(Debug)]
pub struct PointerTracker {
    pointers: SmallVec<[TrackedPointer; 4]>,
    pan_threshold: f32,
    threshold_px: f32,
    tap_timeout_nanos: u64,
    panning: bool,
    down_nanos: u64,
    gesture_start: Point,
    pinch_start: Option<f32>,
    mouse_position: Point,
}

impl PointerTracker {
    /// `pan_threshold` in points, `tap_timeout_nanos` for tap detection
    pub fn new(pan_threshold: f32, tap_timeout_nanos: u64, density: f32) -> Self {
        Self {
            pointers: SmallVec::new(),
            pan_threshold,
            threshold_px: pan_threshold * density,
            tap_timeout_nanos,
            panning: false,
            down_nanos: 0,
            gesture_start: Point::ZERO,
            pinch_start: None,
            mouse_position: Point::ZERO,
        }
    }

    pub fn set_density(&mut self, density: f32) {
        self.threshold_px = self.pan_threshold * density;
    }

    /// Jitter threshold in pixels
    pub fn threshold_px(&self) -> f32 {
        self.threshold_px
    }

    pub fn touch_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Translate one raw event observed at `now_nanos`
    pub fn process(&mut self, event: &InputEvent, now_nanos: u64) -> Gestures {
        match event {
            InputEvent::Mouse(mouse) => match *mouse {
                MouseEvent::ButtonPressed { x, y, .. } => {
                    self.mouse_position = Point::new(x, y);
                    self.pointer_down(MOUSE_POINTER, Point::new(x, y), now_nanos)
                }
                MouseEvent::Moved { x, y } => {
                    self.mouse_position = Point::new(x, y);
                    self.pointer_move(MOUSE_POINTER, Point::new(x, y), now_nanos)
                }
                MouseEvent::ButtonReleased { x, y, .. } => {
                    self.mouse_position = Point::new(x, y);
                    self.pointer_up(MOUSE_POINTER, Point::new(x, y), now_nanos)
                }
                MouseEvent::Left => Gestures::new(),
            },
            InputEvent::Touch(touch) => {
                let id = touch.pointer_id();
                match (touch, touch.location()) {
                    (TouchEvent::Started { .. }, Some(at)) => self.pointer_down(id, at, now_nanos),
                    (TouchEvent::Moved { .. }, Some(at)) => self.pointer_move(id, at, now_nanos),
                    (TouchEvent::Ended { .. }, Some(at)) => self.pointer_up(id, at, now_nanos),
                    _ => self.cancel(now_nanos),
                }
            }
            InputEvent::Scroll { delta_x, delta_y } => {
                let mut event = GestureEvent::new(GestureKind::Wheel, self.mouse_position);
                event.wheel_delta = Point::new(*delta_x, *delta_y);
                event.touch_count = self.pointers.len();
                event.timestamp_nanos = now_nanos;
                smallvec::smallvec![event]
            }
        }
    }

    fn pointer_down(&mut self, id: u64, location: Point, now: u64) -> Gestures {
        if self.pointers.iter().any(|p| p.id == id) {
            return Gestures::new();
        }
        if self.pointers.is_empty() {
            self.panning = false;
            self.down_nanos = now;
            self.gesture_start = location;
            self.pinch_start = None;
        }
        self.pointers.push(TrackedPointer {
            id,
            start: location,
            last: location,
            last_nanos: now,
            velocity: Point::ZERO,
        });
        if self.pointers.len() == 2 {
            self.pinch_start = Some(self.pinch_distance());
        }

        let mut event = self.event(GestureKind::Down, id, location, location, now);
        event.touch_count = self.pointers.len();
        smallvec::smallvec![event]
    }

    fn pointer_move(&mut self, id: u64, location: Point, now: u64) -> Gestures {
        let Some(index) = self.pointers.iter().position(|p| p.id == id) else {
            return Gestures::new();
        };

        let pointer = self.pointers[index];
        if !self.panning && (location - pointer.start).length() < self.threshold_px {
            return Gestures::new();
        }
        self.panning = true;

        let delta = location - pointer.last;
        let dt = now.saturating_sub(pointer.last_nanos);
        let velocity = if dt > 0 {
            delta * (1e9 / dt as f32)
        } else {
            pointer.velocity
        };
        {
            let tracked = &mut self.pointers[index];
            tracked.last = location;
            tracked.last_nanos = now;
            tracked.velocity = velocity;
        }

        if let (Some(start_distance), true) = (self.pinch_start, self.pointers.len() >= 2) {
            let mut event = self.event(
                GestureKind::Pinching,
                id,
                self.pointers[0].last.midpoint(self.pointers[1].last),
                self.gesture_start,
                now,
            );
            event.scale = if start_distance > f32::EPSILON {
                self.pinch_distance() / start_distance
            } else {
                1.0
            };
            event.delta = delta;
            event.velocity = velocity;
            return smallvec::smallvec![event];
        }

        let mut event = self.event(GestureKind::Panning, id, location, pointer.start, now);
        event.delta = delta;
        event.velocity = velocity;
        smallvec::smallvec![event]
    }

    fn pointer_up(&mut self, id: u64, location: Point, now: u64) -> Gestures {
        let Some(index) = self.pointers.iter().position(|p| p.id == id) else {
            return Gestures::new();
        };
        let pointer = self.pointers.remove(index);
        if self.pointers.len() < 2 {
            self.pinch_start = None;
        }
        if !self.pointers.is_empty() {
            return Gestures::new();
        }

        let mut gestures = Gestures::new();
        let within_timeout = now.saturating_sub(self.down_nanos) <= self.tap_timeout_nanos;
        if !self.panning && within_timeout {
            gestures.push(self.event(GestureKind::Tapped, id, location, pointer.start, now));
        }
        let mut up = self.event(GestureKind::Up, id, location, pointer.start, now);
        up.velocity = pointer.velocity;
        up.delta = location - pointer.last;
        gestures.push(up);
        self.panning = false;
        gestures
    }

    fn cancel(&mut self, now: u64) -> Gestures {
        let Some(last) = self.pointers.last().copied() else {
            return Gestures::new();
        };
        self.pointers.clear();
        self.pinch_start = None;
        self.panning = false;
        smallvec::smallvec![self.event(GestureKind::Cancelled, last.id, last.last, last.start, now)]
    }

    fn pinch_distance(&self) -> f32 {
        match (self.pointers.first(), self.pointers.get(1)) {
            (Some(a), Some(b)) => a.last.distance_to(b.last),
            _ => 0.0,
        }
    }

    fn event(&self, kind: GestureKind, id: u64, location: Point, start: Point, now: u64) -> GestureEvent {
        let mut event = GestureEvent::new(kind, location).with_start(start);
        event.pointer_id = id;
        event.touch_count = self.pointers.len().max(1);
        event.timestamp_nanos = now;
        event
    }
}

//! Normalized gesture events and the capability traits that receive them
//!
//! Raw platform pointer input is turned into [`GestureEvent`]s by the root
//! container. Nodes opt into receiving them by implementing
//! [`GestureListener`], which builds on [`HitTestable`] and
//! [`FocusObservable`].

use crate::geometry::{Point, Rect};
use crate::node::NodeId;

/// Kind of a normalized gesture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// A pointer touched down
    Down,
    /// Pointer moved past the jitter threshold
    Panning,
    /// Last pointer lifted
    Up,
    /// Up without panning within the tap timeout
    Tapped,
    /// Two pointers changed their distance
    Pinching,
    /// Mouse wheel or trackpad scroll
    Wheel,
    /// Platform cancelled the gesture
    Cancelled,
}

impl GestureKind {
    /// Up-type events are offered to every listener so drag state can reset
    pub fn is_up_type(self) -> bool {
        matches!(self, GestureKind::Up | GestureKind::Cancelled)
    }
}

/// A normalized gesture event in physical pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub pointer_id: u64,
    /// Current pointer location
    pub location: Point,
    /// Where the gesture started (the Down location)
    pub start_location: Point,
    /// Movement since the previous event
    pub delta: Point,
    /// Movement since the Down event
    pub total_distance: Point,
    /// Pixels per second
    pub velocity: Point,
    /// Number of pointers currently down
    pub touch_count: usize,
    /// Pinch scale relative to the pinch start, 1.0 otherwise
    pub scale: f32,
    /// Wheel delta for `Wheel` events
    pub wheel_delta: Point,
    pub timestamp_nanos: u64,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, location: Point) -> Self {
        Self {
            kind,
            pointer_id: 0,
            location,
            start_location: location,
            delta: Point::ZERO,
            total_distance: Point::ZERO,
            velocity: Point::ZERO,
            touch_count: 1,
            scale: 1.0,
            wheel_delta: Point::ZERO,
            timestamp_nanos: 0,
        }
    }

    pub fn with_start(mut self, start_location: Point) -> Self {
        self.start_location = start_location;
        self.total_distance = self.location - start_location;
        self
    }

    pub fn is_up_type(&self) -> bool {
        self.kind.is_up_type()
    }
}

/// Marker returned by a listener that handled an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumed;

/// Something with last-known bounds that can be hit-tested
pub trait HitTestable {
    /// Bounds from the last drawn frame, physical pixels
    fn hit_bounds(&self) -> Rect;

    fn hit_test(&self, point: Point) -> bool {
        self.hit_bounds().contains(point)
    }
}

/// Receives focus transitions from the gesture dispatcher
pub trait FocusObservable {
    fn on_focus_changed(&self, _focused: bool) {}
}

/// A node that receives gestures
pub trait GestureListener: HitTestable + FocusObservable + Send + Sync {
    fn listener_id(&self) -> NodeId;

    fn z_index(&self) -> i32 {
        0
    }

    /// Transparent listeners only see up-type events, and only while focused
    fn input_transparent(&self) -> bool {
        false
    }

    /// False while hidden or disabled
    fn accepts_gestures(&self) -> bool {
        true
    }

    /// Disposed listeners are dropped by the dispatcher on the next event,
    /// losing focus if they held it
    fn is_disposed(&self) -> bool {
        false
    }

    /// Handle an event; `Some(Consumed)` stops propagation
    fn on_gesture(&self, event: &GestureEvent) -> Option<Consumed>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_type_kinds() {
        assert!(GestureKind::Up.is_up_type());
        assert!(GestureKind::Cancelled.is_up_type());
        assert!(!GestureKind::Down.is_up_type());
        assert!(!GestureKind::Tapped.is_up_type());
    }

    #[test]
    fn test_with_start_sets_total_distance() {
        let e = GestureEvent::new(GestureKind::Panning, Point::new(15.0, 5.0))
            .with_start(Point::new(10.0, 10.0));
        assert_eq!(e.total_distance, Point::new(5.0, -5.0));
    }
}

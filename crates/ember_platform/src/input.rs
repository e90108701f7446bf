//! Raw input forwarded by a platform adapter
//!
//! Coordinates are surface pixels. The runtime's pointer tracker turns these
//! into normalized gestures; nothing here filters or interprets them.

use ember_core::Point;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Mouse(MouseEvent),
    Touch(TouchEvent),
    /// Wheel or trackpad scroll, located at the last known mouse position
    Scroll { delta_x: f32, delta_y: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum MouseEvent {
    Moved { x: f32, y: f32 },
    ButtonPressed { button: MouseButton, x: f32, y: f32 },
    ButtonReleased { button: MouseButton, x: f32, y: f32 },
    /// Cursor left the surface
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// One touch point's lifecycle; `id` is stable from start to end
#[derive(Clone, Debug, PartialEq)]
pub enum TouchEvent {
    Started { id: u64, x: f32, y: f32 },
    Moved { id: u64, x: f32, y: f32 },
    Ended { id: u64, x: f32, y: f32 },
    /// The system took the touch over (e.g. an edge swipe)
    Cancelled { id: u64 },
}

impl TouchEvent {
    pub fn pointer_id(&self) -> u64 {
        match *self {
            TouchEvent::Started { id, .. }
            | TouchEvent::Moved { id, .. }
            | TouchEvent::Ended { id, .. }
            | TouchEvent::Cancelled { id } => id,
        }
    }

    /// Touch location; cancellation carries none
    pub fn location(&self) -> Option<Point> {
        match *self {
            TouchEvent::Started { x, y, .. }
            | TouchEvent::Moved { x, y, .. }
            | TouchEvent::Ended { x, y, .. } => Some(Point::new(x, y)),
            TouchEvent::Cancelled { .. } => None,
        }
    }
}

/// Platform text-input controller
///
/// The gesture dispatcher calls `dismiss` when focus is cleared entirely.
pub trait InputMethod: Send + Sync {
    fn dismiss(&self);
}

/// Input method for platforms without a soft keyboard
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInputMethod;

impl InputMethod for NoInputMethod {
    fn dismiss(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_accessors() {
        let moved = TouchEvent::Moved {
            id: 7,
            x: 1.0,
            y: 2.0,
        };
        assert_eq!(moved.pointer_id(), 7);
        assert_eq!(moved.location(), Some(Point::new(1.0, 2.0)));

        let cancelled = TouchEvent::Cancelled { id: 3 };
        assert_eq!(cancelled.pointer_id(), 3);
        assert_eq!(cancelled.location(), None);
    }
}

//! Scene node contract consumed by the frame engine
//!
//! Concrete widgets live outside the engine. They implement [`SceneNode`]
//! and, when they take input, the capability traits in [`crate::gesture`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::frame::FrameContext;
use crate::geometry::{Rect, Size};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A retained visual-tree element
///
/// All methods take `&self`: the paint callback may run on a rendering
/// thread while the UI context mutates the node, so implementors keep their
/// state behind atomics or locks.
pub trait SceneNode: Send + Sync {
    fn id(&self) -> NodeId;

    /// Draw into the frame at `bounds` (physical pixels)
    fn render(&self, ctx: &mut FrameContext<'_>, bounds: Rect, scale: f32);

    /// Desired size for the given available space (physical pixels)
    fn measure(&self, available_width: f32, available_height: f32) -> Size;

    fn is_visible(&self) -> bool;

    fn is_disposed(&self) -> bool;

    /// Visible and every ancestor visible
    fn is_visible_in_tree(&self) -> bool {
        self.is_visible()
    }

    fn can_draw(&self) -> bool {
        self.is_visible() && !self.is_disposed()
    }

    fn z_index(&self) -> i32 {
        0
    }

    fn input_transparent(&self) -> bool {
        false
    }

    /// Called on the node once per frame before rendering
    fn on_before_draw(&self) {}

    /// Called before `measure` when a remeasure was requested
    fn on_before_measure(&self) {}

    /// Release resources; must be idempotent
    fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique_and_ordered() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(format!("{}", a), format!("node#{}", a.as_raw()));
    }
}

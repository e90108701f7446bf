//! Per-frame value object

use crate::canvas::Canvas;
use crate::geometry::Rect;
use crate::node::NodeId;

/// Everything a node needs while one frame is being composed
///
/// Built by the root container at the top of every paint callback and
/// dropped when the frame finalizes.
pub struct FrameContext<'a> {
    /// Canvas of the active surface
    pub canvas: &'a mut dyn Canvas,
    /// Frame timestamp in nanoseconds on the scheduler's monotonic clock
    pub frame_time_nanos: u64,
    /// Surface bounds in physical pixels
    pub bounds: Rect,
    /// Display density (pixels per point)
    pub scale: f32,
    /// Root container that owns this frame
    pub root: NodeId,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        canvas: &'a mut dyn Canvas,
        frame_time_nanos: u64,
        bounds: Rect,
        scale: f32,
        root: NodeId,
    ) -> Self {
        Self {
            canvas,
            frame_time_nanos,
            bounds,
            scale,
            root,
        }
    }

    /// Frame time in seconds, for animators that integrate over time
    pub fn frame_time_secs(&self) -> f64 {
        self.frame_time_nanos as f64 / 1_000_000_000.0
    }
}

impl std::fmt::Debug for FrameContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameContext")
            .field("canvas_size", &self.canvas.size())
            .field("frame_time_nanos", &self.frame_time_nanos)
            .field("bounds", &self.bounds)
            .field("scale", &self.scale)
            .field("root", &self.root)
            .finish()
    }
}

//! Visual transform chains
//!
//! A chain is the ordered list of nodes from the root to a target. While a
//! frame renders, each node on the chain reports the transform it applied;
//! the chain folds them into one accumulated [`VisualTransform`] that
//! dependent effects (shadows, hero transitions) read after the frame.

use crate::geometry::Point;
use crate::node::NodeId;

/// Transform state applied by a single node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualTransform {
    pub translation: Point,
    pub opacity: f32,
    /// Degrees, clockwise
    pub rotation: f32,
    pub scale: Point,
}

impl VisualTransform {
    pub const IDENTITY: VisualTransform = VisualTransform {
        translation: Point::ZERO,
        opacity: 1.0,
        rotation: 0.0,
        scale: Point::new(1.0, 1.0),
    };

    pub fn translated(x: f32, y: f32) -> Self {
        Self {
            translation: Point::new(x, y),
            ..Self::IDENTITY
        }
    }

    /// Combine with a child's transform (parent first)
    pub fn combine(&self, child: &VisualTransform) -> VisualTransform {
        VisualTransform {
            translation: self.translation + child.translation,
            opacity: self.opacity * child.opacity,
            rotation: self.rotation + child.rotation,
            scale: Point::new(self.scale.x * child.scale.x, self.scale.y * child.scale.y),
        }
    }
}

impl Default for VisualTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Ordered root→target node chain with per-frame accumulation
#[derive(Clone, Debug, PartialEq)]
pub struct VisualTransformChain {
    target: NodeId,
    nodes: Vec<NodeId>,
    reported: Vec<Option<VisualTransform>>,
}

impl VisualTransformChain {
    /// `nodes` must be ordered from the root to `target` inclusive
    pub fn new(target: NodeId, nodes: Vec<NodeId>) -> Self {
        let reported = vec![None; nodes.len()];
        Self {
            target,
            nodes,
            reported,
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Forget everything reported in the previous frame
    pub fn reset(&mut self) {
        self.reported.iter_mut().for_each(|r| *r = None);
    }

    /// Record the transform a node applied this frame
    ///
    /// Returns false when the node is not part of the chain or already
    /// reported this frame.
    pub fn on_node_rendered(&mut self, node: NodeId, transform: VisualTransform) -> bool {
        let Some(index) = self.nodes.iter().position(|n| *n == node) else {
            return false;
        };
        if self.reported[index].is_some() {
            return false;
        }
        self.reported[index] = Some(transform);
        true
    }

    /// Number of chain nodes rendered in the current frame
    pub fn rendered_nodes(&self) -> usize {
        self.reported.iter().filter(|r| r.is_some()).count()
    }

    /// Every node from root to target rendered this frame
    pub fn is_complete(&self) -> bool {
        !self.nodes.is_empty() && self.rendered_nodes() == self.nodes.len()
    }

    /// Accumulated transform of the nodes rendered so far, in chain order
    pub fn accumulated(&self) -> VisualTransform {
        self.reported
            .iter()
            .flatten()
            .fold(VisualTransform::IDENTITY, |acc, t| acc.combine(t))
    }
}

//! Per-root set of visual transform chains

use std::sync::Mutex;

use ember_core::{NodeId, VisualTransform, VisualTransformChain};
use rustc_hash::FxHashMap;

/// Chains keyed by target node, reset at the start of every frame
#[derive(Default)]
pub struct TransformChains {
    chains: Mutex<FxHashMap<NodeId, VisualTransformChain>>,
}

impl TransformChains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `chain`, replacing any chain for the same target
    pub fn register(&self, chain: VisualTransformChain) {
        self.chains.lock().unwrap().insert(chain.target(), chain);
    }

    pub fn unregister(&self, target: NodeId) -> bool {
        self.chains.lock().unwrap().remove(&target).is_some()
    }

    /// Drop every chain passing through `node`
    pub fn remove_node(&self, node: NodeId) -> usize {
        let mut chains = self.chains.lock().unwrap();
        let before = chains.len();
        chains.retain(|_, chain| !chain.contains(node));
        before - chains.len()
    }

    pub fn reset_all(&self) {
        for chain in self.chains.lock().unwrap().values_mut() {
            chain.reset();
        }
    }

    /// Feed a node's applied transform to every chain containing it;
    /// returns how many chains accepted it
    pub fn report(&self, node: NodeId, transform: VisualTransform) -> usize {
        self.chains
            .lock()
            .unwrap()
            .values_mut()
            .map(|chain| chain.on_node_rendered(node, transform))
            .filter(|accepted| *accepted)
            .count()
    }

    pub fn chain(&self, target: NodeId) -> Option<VisualTransformChain> {
        self.chains.lock().unwrap().get(&target).cloned()
    }

    pub fn accumulated(&self, target: NodeId) -> Option<VisualTransform> {
        self.chains
            .lock()
            .unwrap()
            .get(&target)
            .map(|chain| chain.accumulated())
    }

    pub fn len(&self) -> usize {
        self.chains.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reaches_every_chain_through_node() {
        let chains = TransformChains::new();
        let (root, a, b) = (NodeId::next(), NodeId::next(), NodeId::next());
        chains.register(VisualTransformChain::new(a, vec![root, a]));
        chains.register(VisualTransformChain::new(b, vec![root, b]));

        assert_eq!(chains.report(root, VisualTransform::translated(1.0, 0.0)), 2);
        assert_eq!(chains.report(a, VisualTransform::translated(0.0, 2.0)), 1);
        assert_eq!(
            chains.accumulated(a).map(|t| t.translation),
            Some(ember_core::Point::new(1.0, 2.0))
        );
        assert!(chains.chain(a).unwrap().is_complete());
        assert!(!chains.chain(b).unwrap().is_complete());

        chains.reset_all();
        assert_eq!(chains.chain(a).unwrap().rendered_nodes(), 0);

        assert_eq!(chains.remove_node(root), 2);
        assert!(chains.is_empty());
    }
}

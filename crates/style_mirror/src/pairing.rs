//! One-to-one relation between source nodes and their mirror copies.
//!
//! Keys and values are handles into two different documents. Both directions
//! are indexed so that discarding a mirror subtree can drop the entries of
//! every node inside it.

use std::collections::HashMap;

use indextree::NodeId;

#[derive(Debug, Default, Clone)]
pub struct PairingMap {
    forward: HashMap<NodeId, NodeId>,
    reverse: HashMap<NodeId, NodeId>,
}

impl PairingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror counterpart of `source`.
    pub fn get(&self, source: NodeId) -> Option<NodeId> {
        self.forward.get(&source).copied()
    }

    pub fn has(&self, source: NodeId) -> bool {
        self.forward.contains_key(&source)
    }

    /// Source node mirrored by `mirror`.
    pub fn source_of(&self, mirror: NodeId) -> Option<NodeId> {
        self.reverse.get(&mirror).copied()
    }

    /// Pair `source` with `mirror`, replacing any previous partner of either.
    pub fn set(&mut self, source: NodeId, mirror: NodeId) {
        if let Some(previous_mirror) = self.forward.insert(source, mirror) {
            if previous_mirror != mirror {
                self.reverse.remove(&previous_mirror);
            }
        }
        if let Some(previous_source) = self.reverse.insert(mirror, source) {
            if previous_source != source {
                self.forward.remove(&previous_source);
            }
        }
    }

    /// Drop the entry for `source`, returning its mirror if it had one.
    pub fn delete(&mut self, source: NodeId) -> Option<NodeId> {
        let mirror = self.forward.remove(&source)?;
        self.reverse.remove(&mirror);
        Some(mirror)
    }

    /// Drop the entry whose mirror is `mirror`, returning its source.
    pub fn delete_mirror(&mut self, mirror: NodeId) -> Option<NodeId> {
        let source = self.reverse.remove(&mirror)?;
        self.forward.remove(&source);
        Some(source)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// Every mirror node currently paired, in no particular order.
    pub fn mirrors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.forward.values().copied()
    }

    /// `(source, mirror)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.forward
            .iter()
            .map(|(source, mirror)| (*source, *mirror))
    }
}

impl Extend<(NodeId, NodeId)> for PairingMap {
    fn extend<I: IntoIterator<Item = (NodeId, NodeId)>>(&mut self, pairs: I) {
        for (source, mirror) in pairs {
            self.set(source, mirror);
        }
    }
}

impl FromIterator<(NodeId, NodeId)> for PairingMap {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(pairs: I) -> Self {
        let mut map = Self::new();
        map.extend(pairs);
        map
    }
}

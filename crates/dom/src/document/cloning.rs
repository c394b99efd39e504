use anyhow::{Error, anyhow};
use indextree::NodeId;

use super::{DOMNode, Document};

impl Document {
    /// Copy `id` (and, when `deep`, its whole subtree) into a new detached
    /// node of this document.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId, Error> {
        let data = self.node_checked(id)?.clone();
        let copy = self.new_detached(data);
        if deep {
            let children: Vec<NodeId> = self.children(id).collect();
            for child in children {
                let child_copy = self.clone_node(child, true)?;
                copy.checked_append(child_copy, &mut self.dom)
                    .map_err(|err| anyhow!("failed to build clone: {err:?}"))?;
            }
        }
        Ok(copy)
    }

    /// Deep-copy `id` from another document into a new detached node of
    /// this one.
    pub fn import_node(&mut self, source: &Self, id: NodeId) -> Result<NodeId, Error> {
        let data: DOMNode = source.node_checked(id)?.clone();
        let copy = self.new_detached(data);
        for child in source.children(id) {
            let child_copy = self.import_node(source, child)?;
            copy.checked_append(child_copy, &mut self.dom)
                .map_err(|err| anyhow!("failed to build imported copy: {err:?}"))?;
        }
        Ok(copy)
    }

    /// Structural equality of two subtrees, possibly in different documents:
    /// same kinds, tags, data, attribute sets and children.
    pub fn is_equal_node(&self, id: NodeId, other: &Self, other_id: NodeId) -> bool {
        let (Some(mine), Some(theirs)) = (self.node(id), other.node(other_id)) else {
            return false;
        };
        let same_attrs = mine.attrs.len() == theirs.attrs.len()
            && mine.attrs.iter().all(|attr| theirs.attrs.contains(attr));
        if mine.kind != theirs.kind || !same_attrs {
            return false;
        }
        let mut own_children = self.children(id);
        let mut other_children = other.children(other_id);
        loop {
            match (own_children.next(), other_children.next()) {
                (None, None) => return true,
                (Some(own), Some(other_child)) => {
                    if !self.is_equal_node(own, other, other_child) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

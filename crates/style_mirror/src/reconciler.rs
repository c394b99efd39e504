//! Replays source mutation records against the mirror tree.
//!
//! Every mirror edit is a whole-node copy: additions import the added subtree,
//! modifications import a fresh copy of the modified node and swap it in at
//! the same position. Records whose nodes are not (or no longer) paired are
//! skipped.

use anyhow::Error;
use dom::{Document, MutationRecord};
use indextree::NodeId;
use log::{debug, trace, warn};

use crate::config::MirrorConfig;
use crate::pairing::PairingMap;
use crate::telemetry::MirrorCounters;
use crate::zipper::zip_subtrees;

/// What a single step did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Applied,
    Skipped,
}

/// Mirror-side state of an active session.
#[derive(Debug)]
pub struct Reconciler {
    pairs: PairingMap,
    source_head: NodeId,
    mirror_head: NodeId,
    config: MirrorConfig,
}

impl Reconciler {
    pub fn new(
        source_head: NodeId,
        mirror_head: NodeId,
        pairs: PairingMap,
        config: MirrorConfig,
    ) -> Self {
        Self {
            pairs,
            source_head,
            mirror_head,
            config,
        }
    }

    pub const fn pairs(&self) -> &PairingMap {
        &self.pairs
    }

    pub const fn mirror_head(&self) -> NodeId {
        self.mirror_head
    }

    /// Copy a top-level container of the source into the mirror head and pair
    /// the whole copy.
    pub fn seed(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        container: NodeId,
    ) -> Result<NodeId, Error> {
        let copy = mirror.import_node(source, container)?;
        mirror.append_child(self.mirror_head, copy)?;
        self.pairs
            .extend(zip_subtrees(source, container, mirror, copy));
        Ok(copy)
    }

    /// Apply one batch in delivery order.
    pub fn apply_batch(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        batch: &[MutationRecord],
    ) -> MirrorCounters {
        let mut counters = MirrorCounters {
            batches: 1,
            ..MirrorCounters::default()
        };
        for record in batch {
            counters.records += 1;
            self.apply_record(source, mirror, record, &mut counters);
        }
        counters
    }

    fn apply_record(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        record: &MutationRecord,
        counters: &mut MirrorCounters,
    ) {
        match record {
            MutationRecord::ChildList {
                target,
                added,
                removed,
                ..
            } => {
                for node in removed {
                    match self.node_removed(source, mirror, *node) {
                        Ok(Step::Applied) => counters.removed += 1,
                        Ok(Step::Skipped) => counters.ignored += 1,
                        Err(err) => {
                            warn!("could not remove mirror of {node:?}: {err:#}");
                            counters.ignored += 1;
                        }
                    }
                }
                for node in added {
                    match self.node_added(source, mirror, *target, *node) {
                        Ok(Step::Applied) => counters.added += 1,
                        Ok(Step::Skipped) => counters.ignored += 1,
                        Err(err) => {
                            warn!("could not mirror added node {node:?}: {err:#}");
                            counters.ignored += 1;
                        }
                    }
                }
            }
            MutationRecord::Attributes { target, .. }
            | MutationRecord::CharacterData { target, .. } => {
                match self.node_modified(source, mirror, *target) {
                    Ok(Step::Applied) => counters.replaced += 1,
                    Ok(Step::Skipped) => counters.ignored += 1,
                    Err(err) => {
                        warn!("could not refresh mirror of {target:?}: {err:#}");
                        counters.ignored += 1;
                    }
                }
            }
        }
    }

    /// An untracked node can still carry paired containers below it, such as
    /// a `<style>` inside a `<noscript>`; those mirrors go with it.
    fn node_removed(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        node: NodeId,
    ) -> Result<Step, Error> {
        if self.pairs.has(node) {
            self.release_mirror_of(mirror, node)?;
            return Ok(Step::Applied);
        }
        let nested: Vec<NodeId> = source
            .descendants(node)
            .filter(|descendant| self.pairs.has(*descendant))
            .collect();
        let mut step = Step::Skipped;
        for descendant in nested {
            // Already released with a paired ancestor.
            if !self.pairs.has(descendant) {
                continue;
            }
            self.release_mirror_of(mirror, descendant)?;
            step = Step::Applied;
        }
        if step == Step::Skipped {
            trace!("removed {node:?} was never mirrored");
        }
        Ok(step)
    }

    /// Unpair `node` and its descendants, then detach and free its mirror.
    fn release_mirror_of(&mut self, mirror: &mut Document, node: NodeId) -> Result<(), Error> {
        let Some(mirror_node) = self.pairs.get(node) else {
            return Ok(());
        };
        self.forget_mirror_subtree(mirror, mirror_node);
        if let Some(parent) = mirror.parent(mirror_node) {
            mirror.remove_child(parent, mirror_node)?;
        }
        mirror.discard(mirror_node)?;
        debug!("removed mirror {mirror_node:?} of {node:?}");
        Ok(())
    }

    fn node_added(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        parent: NodeId,
        node: NodeId,
    ) -> Result<Step, Error> {
        if self.pairs.has(node) {
            trace!("added {node:?} was already copied with an ancestor");
            return Ok(Step::Skipped);
        }
        let mirror_parent = if parent == self.source_head && self.is_container(source, node) {
            self.mirror_head
        } else if let Some(mirror_parent) = self.pairs.get(parent) {
            mirror_parent
        } else {
            trace!("added {node:?} lies outside the mirrored subtrees");
            return Ok(Step::Skipped);
        };

        let reference = self.mirror_reference(source, mirror, parent, node, mirror_parent);
        let copy = mirror.import_node(source, node)?;
        mirror.insert_before(mirror_parent, copy, reference)?;
        self.pairs.extend(zip_subtrees(source, node, mirror, copy));
        debug!("mirrored added {node:?} as {copy:?}");
        Ok(Step::Applied)
    }

    fn node_modified(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        node: NodeId,
    ) -> Result<Step, Error> {
        let Some(old_mirror) = self.pairs.get(node) else {
            trace!("modified {node:?} is not mirrored");
            return Ok(Step::Skipped);
        };
        let Some(mirror_parent) = mirror.parent(old_mirror) else {
            trace!("mirror {old_mirror:?} of {node:?} is already detached");
            return Ok(Step::Skipped);
        };
        let copy = mirror.import_node(source, node)?;
        mirror.replace_child(mirror_parent, copy, old_mirror)?;
        self.forget_mirror_subtree(mirror, old_mirror);
        mirror.discard(old_mirror)?;
        self.pairs.extend(zip_subtrees(source, node, mirror, copy));
        debug!("replaced mirror {old_mirror:?} of {node:?} with {copy:?}");
        Ok(Step::Applied)
    }

    /// Detach and free every mirrored subtree and clear the pairing.
    /// Returns how many subtrees were detached.
    pub fn detach_all(&mut self, mirror: &mut Document) -> usize {
        let mut detached = 0;
        let roots: Vec<NodeId> = self
            .pairs
            .mirrors()
            .filter(|mirror_node| {
                mirror
                    .parent(*mirror_node)
                    .is_none_or(|parent| self.pairs.source_of(parent).is_none())
            })
            .collect();
        for mirror_node in roots {
            if let Some(parent) = mirror.parent(mirror_node) {
                match mirror.remove_child(parent, mirror_node) {
                    Ok(()) => detached += 1,
                    Err(err) => {
                        warn!("could not detach mirror {mirror_node:?}: {err:#}");
                        continue;
                    }
                }
            }
            if let Err(err) = mirror.discard(mirror_node) {
                warn!("could not free mirror {mirror_node:?}: {err:#}");
            }
        }
        self.pairs.clear();
        detached
    }

    fn is_container(&self, source: &Document, node: NodeId) -> bool {
        source
            .tag_name(node)
            .is_some_and(|tag| self.config.is_container_tag(tag))
    }

    /// Mirror of the nearest following source sibling that is paired under
    /// the same mirror parent. `None` appends.
    fn mirror_reference(
        &self,
        source: &Document,
        mirror: &Document,
        parent: NodeId,
        node: NodeId,
        mirror_parent: NodeId,
    ) -> Option<NodeId> {
        if source.parent(node) != Some(parent) {
            return None;
        }
        source
            .next_siblings(node)
            .filter_map(|sibling| self.pairs.get(sibling))
            .find(|candidate| mirror.parent(*candidate) == Some(mirror_parent))
    }

    fn forget_mirror_subtree(&mut self, mirror: &Document, mirror_root: NodeId) {
        for mirror_node in mirror.descendants(mirror_root) {
            self.pairs.delete_mirror(mirror_node);
        }
    }
}

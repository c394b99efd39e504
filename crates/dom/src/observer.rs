//! Mutation observation for [`Document`](crate::Document) trees.
//!
//! Observers register a root node and a set of options. Records are queued
//! per observer at the moment the edit happens and handed over as a single
//! batch at the next [`Document::notify_observers`](crate::Document::notify_observers)
//! checkpoint, over an unbounded channel owned by the observer.

use anyhow::{Error, bail};
use indextree::NodeId;
use log::trace;
use tokio::sync::mpsc;

use crate::record::{MutationKind, MutationRecord};

/// One delivery of records, in the order the edits happened.
pub type MutationBatch = Vec<MutationRecord>;

/// Identifies an observer registration within one document.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ObserverId(pub u64);

/// Which edits an observer is interested in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// Watch every descendant of the root, not just the root itself.
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
}

impl ObserveOptions {
    /// Every kind of edit anywhere under the root, with old values.
    pub const fn everything() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_old_value: true,
            character_data_old_value: true,
        }
    }

    const fn wants(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => self.attributes,
            MutationKind::CharacterData => self.character_data,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if !(self.child_list || self.attributes || self.character_data) {
            bail!("observe options must request at least one of child_list, attributes or character_data");
        }
        Ok(())
    }
}

/// Receiving end of an observer registration.
///
/// Dropping or [disconnecting](Self::disconnect) it cancels the registration;
/// the document prunes it at its next checkpoint.
#[derive(Debug)]
pub struct MutationObserver {
    id: ObserverId,
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
    connected: bool,
}

impl MutationObserver {
    pub const fn id(&self) -> ObserverId {
        self.id
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stop receiving new batches.
    ///
    /// Batches delivered before this call stay readable, so consumers that
    /// keep draining must check their own state first.
    pub fn disconnect(&mut self) {
        self.receiver.close();
        self.connected = false;
    }

    /// Next delivered batch, if one is already waiting.
    pub fn try_next_batch(&mut self) -> Option<MutationBatch> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next delivered batch. Returns `None` once the
    /// registration is gone and every delivered batch has been read.
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }
}

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    root: NodeId,
    options: ObserveOptions,
    pending: MutationBatch,
    sender: mpsc::UnboundedSender<MutationBatch>,
}

impl Registration {
    /// `path` starts at the record target and walks up to the tree root.
    fn is_interested(&self, path: &[NodeId], kind: MutationKind) -> bool {
        if !self.options.wants(kind) || self.sender.is_closed() {
            return false;
        }
        match path.split_first() {
            Some((target, ancestors)) => {
                *target == self.root || (self.options.subtree && ancestors.contains(&self.root))
            }
            None => false,
        }
    }
}

/// Observer registrations held by a document.
#[derive(Debug, Default)]
pub(crate) struct Registrations {
    next_id: u64,
    entries: Vec<Registration>,
}

impl Registrations {
    pub(crate) fn register(&mut self, root: NodeId, options: ObserveOptions) -> MutationObserver {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Registration {
            id,
            root,
            options,
            pending: Vec::new(),
            sender,
        });
        trace!("registered observer {id:?} on {root:?}");
        MutationObserver {
            id,
            receiver,
            connected: true,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn queue(&mut self, path: &[NodeId], record: &MutationRecord) {
        let kind = record.kind();
        for registration in &mut self.entries {
            if registration.is_interested(path, kind) {
                let options = registration.options;
                registration.pending.push(record.filtered(
                    options.attribute_old_value,
                    options.character_data_old_value,
                ));
            }
        }
    }

    /// Send every non-empty pending queue and drop cancelled registrations.
    /// Returns the number of batches sent.
    pub(crate) fn deliver(&mut self) -> usize {
        self.entries.retain(|registration| !registration.sender.is_closed());
        let mut delivered = 0;
        for registration in &mut self.entries {
            if registration.pending.is_empty() {
                continue;
            }
            let batch = core::mem::take(&mut registration.pending);
            trace!(
                "delivering {} record(s) to observer {:?}",
                batch.len(),
                registration.id
            );
            if registration.sender.send(batch).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub(crate) fn take_pending(&mut self, id: ObserverId) -> MutationBatch {
        self.entries
            .iter_mut()
            .find(|registration| registration.id == id)
            .map(|registration| core::mem::take(&mut registration.pending))
            .unwrap_or_default()
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) {
        self.entries.retain(|registration| registration.id != id);
    }
}

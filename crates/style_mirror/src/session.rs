use anyhow::{Context as _, Error, anyhow, bail};
use dom::{Document, MutationObserver, MutationRecord, ObserveOptions};
use indextree::NodeId;
use log::{debug, trace};

use crate::config::MirrorConfig;
use crate::pairing::PairingMap;
use crate::reconciler::Reconciler;
use crate::telemetry::{MirrorCounters, maybe_emit};

enum SessionState {
    Inactive,
    Active {
        /// `None` once a driver task has taken over delivery.
        observer: Option<MutationObserver>,
        reconciler: Reconciler,
    },
}

/// One enable→disable lifecycle of style mirroring.
///
/// The session never touches the source document except to register its
/// observer; the mirror document is written only through this session while
/// it is active.
pub struct MirrorSession {
    state: SessionState,
    config: MirrorConfig,
    counters: MirrorCounters,
}

impl MirrorSession {
    /// Copy every top-level container under the source head into
    /// `mirror_head` and start observing the source head.
    ///
    /// # Errors
    /// Fails when the source document has no head, or when `mirror_head` is
    /// not a node of the mirror document.
    pub fn enable(
        source: &mut Document,
        mirror: &mut Document,
        mirror_head: NodeId,
        config: &MirrorConfig,
    ) -> Result<Self, Error> {
        let source_head = source
            .head()
            .ok_or_else(|| anyhow!("Could not retrieve document head"))?;
        if mirror.node(mirror_head).is_none() {
            bail!("mirror container {mirror_head:?} is not part of the mirror document");
        }

        let mut reconciler = Reconciler::new(
            source_head,
            mirror_head,
            PairingMap::new(),
            config.clone(),
        );
        let containers = source.outermost_elements_named(source_head, &config.container_tags);
        for container in &containers {
            reconciler
                .seed(source, mirror, *container)
                .with_context(|| format!("failed to copy container {container:?}"))?;
        }

        let observer = source.observe(source_head, ObserveOptions::everything())?;
        debug!(
            "style mirroring enabled: {} container(s), {} paired node(s)",
            containers.len(),
            reconciler.pairs().len()
        );
        Ok(Self {
            state: SessionState::Active {
                observer: Some(observer),
                reconciler,
            },
            config: config.clone(),
            counters: MirrorCounters::default(),
        })
    }

    pub const fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// The pairing of the active session.
    pub fn pairs(&self) -> Option<&PairingMap> {
        match &self.state {
            SessionState::Active { reconciler, .. } => Some(reconciler.pairs()),
            SessionState::Inactive => None,
        }
    }

    pub fn mirror_head(&self) -> Option<NodeId> {
        match &self.state {
            SessionState::Active { reconciler, .. } => Some(reconciler.mirror_head()),
            SessionState::Inactive => None,
        }
    }

    /// Totals over every batch applied by this session.
    pub const fn counters(&self) -> MirrorCounters {
        self.counters
    }

    /// Apply every batch that has been delivered so far.
    /// Returns the number of batches applied.
    pub fn try_update_sync(&mut self, source: &Document, mirror: &mut Document) -> usize {
        let mut applied = 0;
        loop {
            let batch = match &mut self.state {
                SessionState::Active {
                    observer: Some(observer),
                    ..
                } => observer.try_next_batch(),
                _ => None,
            };
            let Some(batch) = batch else {
                break;
            };
            self.apply_batch(source, mirror, &batch);
            applied += 1;
        }
        applied
    }

    /// Wait for the next delivered batch and apply it. Returns `false` when no
    /// batch will arrive anymore.
    pub async fn update(&mut self, source: &Document, mirror: &mut Document) -> bool {
        let batch = match &mut self.state {
            SessionState::Active {
                observer: Some(observer),
                ..
            } => observer.next_batch().await,
            _ => None,
        };
        let Some(batch) = batch else {
            return false;
        };
        self.apply_batch(source, mirror, &batch);
        true
    }

    /// Apply one delivered batch. Batches that arrive after teardown are
    /// dropped.
    pub fn apply_batch(
        &mut self,
        source: &Document,
        mirror: &mut Document,
        batch: &[MutationRecord],
    ) -> MirrorCounters {
        let SessionState::Active { reconciler, .. } = &mut self.state else {
            trace!("dropping batch of {} record(s) delivered after teardown", batch.len());
            return MirrorCounters::default();
        };
        let counters = reconciler.apply_batch(source, mirror, batch);
        self.counters.absorb(&counters);
        maybe_emit(self.config.telemetry_enabled, &self.counters);
        counters
    }

    /// Stop observing, detach every mirrored subtree and clear the pairing.
    /// Calling it again is a no-op. Returns how many subtrees were detached.
    pub fn disable(&mut self, mirror: &mut Document) -> usize {
        let state = core::mem::replace(&mut self.state, SessionState::Inactive);
        let SessionState::Active {
            observer,
            mut reconciler,
        } = state
        else {
            return 0;
        };
        if let Some(mut observer) = observer {
            observer.disconnect();
        }
        let detached = reconciler.detach_all(mirror);
        debug!("style mirroring disabled: detached {detached} subtree(s)");
        detached
    }

    /// Hand the observer to a driver that awaits batches itself.
    pub(crate) fn take_observer(&mut self) -> Option<MutationObserver> {
        match &mut self.state {
            SessionState::Active { observer, .. } => observer.take(),
            SessionState::Inactive => None,
        }
    }
}

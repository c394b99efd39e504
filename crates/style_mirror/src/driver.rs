//! Event-driven mirroring for documents shared behind a mutex.
//!
//! A single task owns the observer queue and applies batches one at a time,
//! so batch application is serialized even on a multi-threaded runtime.
//! Locks are only taken between awaits, always in the order
//! session, source, mirror.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Error, anyhow};
use dom::{Document, MutationBatch, MutationObserver};
use indextree::NodeId;
use log::{debug, error};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::MirrorConfig;
use crate::session::MirrorSession;
use crate::telemetry::MirrorCounters;

pub type SharedDocument = Arc<Mutex<Document>>;

fn lock<'guard, T>(mutex: &'guard Mutex<T>, what: &str) -> Result<MutexGuard<'guard, T>, Error> {
    mutex.lock().map_err(|_| anyhow!("{what} lock poisoned"))
}

/// Handle returned by [`enable_mirroring`]; tears the session down.
pub struct Teardown {
    session: Arc<Mutex<MirrorSession>>,
    mirror: SharedDocument,
    task: JoinHandle<()>,
    applied: watch::Receiver<u64>,
}

/// Start mirroring the style containers of `source`'s head into
/// `mirror_head` of `mirror`, applying delivered batches on `handle`.
///
/// # Errors
/// Fails when the source document has no head, when `mirror_head` is not in
/// the mirror document, or when either document lock is poisoned.
pub fn enable_mirroring(
    handle: &Handle,
    source: &SharedDocument,
    mirror: &SharedDocument,
    mirror_head: NodeId,
    config: &MirrorConfig,
) -> Result<Teardown, Error> {
    let (session, observer) = {
        let mut source_doc = lock(source, "source document")?;
        let mut mirror_doc = lock(mirror, "mirror document")?;
        let mut session =
            MirrorSession::enable(&mut source_doc, &mut mirror_doc, mirror_head, config)?;
        let observer = session
            .take_observer()
            .ok_or_else(|| anyhow!("new session has no observer"))?;
        (session, observer)
    };

    let session = Arc::new(Mutex::new(session));
    let (applied_tx, applied_rx) = watch::channel(0_u64);
    let task = handle.spawn(drive(
        observer,
        Arc::clone(&session),
        Arc::clone(source),
        Arc::clone(mirror),
        applied_tx,
    ));
    Ok(Teardown {
        session,
        mirror: Arc::clone(mirror),
        task,
        applied: applied_rx,
    })
}

async fn drive(
    mut observer: MutationObserver,
    session: Arc<Mutex<MirrorSession>>,
    source: SharedDocument,
    mirror: SharedDocument,
    applied: watch::Sender<u64>,
) {
    while let Some(batch) = observer.next_batch().await {
        match apply_delivered(&session, &source, &mirror, &batch) {
            Ok(true) => {
                applied.send_modify(|count| *count += 1);
            }
            Ok(false) => break,
            Err(err) => {
                error!("style mirroring stopped: {err:#}");
                break;
            }
        }
    }
    debug!("style mirroring task finished");
}

/// Returns `false` once the session has been torn down.
fn apply_delivered(
    session: &Mutex<MirrorSession>,
    source: &Mutex<Document>,
    mirror: &Mutex<Document>,
    batch: &MutationBatch,
) -> Result<bool, Error> {
    let mut session = lock(session, "session")?;
    if !session.is_active() {
        return Ok(false);
    }
    let source = lock(source, "source document")?;
    let mut mirror = lock(mirror, "mirror document")?;
    session.apply_batch(&source, &mut mirror, batch);
    Ok(true)
}

impl Teardown {
    /// Stop mirroring and remove every mirrored node. Safe to call more
    /// than once; later calls detach nothing.
    ///
    /// # Errors
    /// Fails if the session or mirror document lock is poisoned.
    pub fn teardown(&self) -> Result<usize, Error> {
        self.task.abort();
        let mut session = lock(&self.session, "session")?;
        let mut mirror = lock(&self.mirror, "mirror document")?;
        Ok(session.disable(&mut mirror))
    }

    pub fn is_active(&self) -> bool {
        lock(&self.session, "session").is_ok_and(|session| session.is_active())
    }

    /// Batches applied by the task so far.
    pub fn batches_applied(&self) -> u64 {
        *self.applied.borrow()
    }

    /// Wait until at least `count` batches have been applied.
    ///
    /// # Errors
    /// Fails if the task stops before reaching `count`.
    pub async fn wait_for_batches(&mut self, count: u64) -> Result<(), Error> {
        let reached = self
            .applied
            .wait_for(|applied| *applied >= count)
            .await
            .is_ok();
        if reached {
            Ok(())
        } else {
            Err(anyhow!(
                "mirroring task stopped after {} batch(es)",
                self.batches_applied()
            ))
        }
    }

    /// Session totals so far.
    ///
    /// # Errors
    /// Fails if the session lock is poisoned.
    pub fn counters(&self) -> Result<MirrorCounters, Error> {
        Ok(lock(&self.session, "session")?.counters())
    }
}

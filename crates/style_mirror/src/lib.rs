#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

//! Keeps the `<style>` content of a secondary document in step with the head
//! of a primary document.
//!
//! The initial stylesheets are deep-copied once and paired node by node;
//! afterwards only the mutation records delivered by the primary document are
//! replayed against the copy. Nothing is ever re-parsed.
//!
//! [`MirrorSession`] is the synchronous core driven by whoever owns both
//! documents. [`enable_mirroring`] wraps it for documents shared behind a
//! mutex and applies batches from a tokio task as they are delivered.

pub mod config;
pub mod driver;
pub mod pairing;
pub mod reconciler;
pub mod session;
pub mod telemetry;
pub mod zipper;

pub use config::MirrorConfig;
pub use driver::{SharedDocument, Teardown, enable_mirroring};
pub use pairing::PairingMap;
pub use reconciler::Reconciler;
pub use session::MirrorSession;
pub use telemetry::MirrorCounters;
pub use zipper::zip_subtrees;

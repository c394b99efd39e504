#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

//! In-memory document model used by the style mirror.
//!
//! Nodes live in an [`indextree`] arena and are addressed by stable
//! [`NodeId`] handles. Every structural or content edit on an attached node
//! queues a [`MutationRecord`] for the observers watching that part of the
//! tree; [`Document::notify_observers`] delivers the queued records as one
//! batch per observer.

pub mod document;
pub mod observer;
pub mod record;

pub use document::{DOMNode, Document, NodeKind};
pub use indextree::NodeId;
pub use observer::{MutationBatch, MutationObserver, ObserveOptions, ObserverId};
pub use record::{MutationKind, MutationRecord};

//! Host-document collaborator for navigation bootstrapping.
//!
//! This crate centralizes the structural side of a page view: a minimal
//! element tree with lookup indices, the document's readiness phase, and a
//! one-shot readiness signal that downstream consumers (the navigation
//! loader) can wait on without polling.

/// Element tree with id/tag indices and the readiness phase.
pub mod document;
pub use document::HostDocument;

/// Document readiness phases and the one-shot readiness signal.
pub mod readiness;
pub use readiness::{DocumentPhase, ReadinessSignal};

/// A 64-bit stable key for nodes in a host document.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The root node key (always present).
    pub const ROOT: NodeKey = NodeKey(0);
}

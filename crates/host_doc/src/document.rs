//! A minimal host document: element tree, lookup indices, readiness phase.
//!
//! The tree tracks only what navigation installation needs: tags,
//! attributes, text, parent/child relations, and id/tag lookup indices.

use crate::NodeKey;
use crate::readiness::{DocumentPhase, ReadinessSignal};
use anyhow::{Error, anyhow};
use log::trace;
use std::collections::HashMap;
use tokio::sync::watch;

/// Content stored for one node in the tree.
#[derive(Clone, Debug)]
enum NodeContent {
    Element {
        tag: String,
        attrs: HashMap<String, String>,
    },
    Text(String),
}

/// One node entry: content plus tree relations.
#[derive(Debug)]
struct NodeEntry {
    content: NodeContent,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// The structural side of a page view.
///
/// Created fresh per page view in the `Loading` phase; `mark_ready` fires
/// the one-shot readiness transition once the structure is available.
pub struct HostDocument {
    nodes: HashMap<NodeKey, NodeEntry>,
    /// Lookup indices
    id_index: HashMap<String, NodeKey>,
    tag_index: HashMap<String, Vec<NodeKey>>,
    next_key: u64,
    phase: watch::Sender<DocumentPhase>,
}

impl HostDocument {
    /// Create a document in the `Loading` phase holding only the root
    /// `html` element.
    #[must_use]
    pub fn new() -> Self {
        let (phase, _initial) = watch::channel(DocumentPhase::Loading);
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeKey::ROOT,
            NodeEntry {
                content: NodeContent::Element {
                    tag: String::from("html"),
                    attrs: HashMap::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );
        let mut tag_index: HashMap<String, Vec<NodeKey>> = HashMap::new();
        tag_index.insert(String::from("html"), vec![NodeKey::ROOT]);
        Self {
            nodes,
            id_index: HashMap::new(),
            tag_index,
            next_key: 1,
            phase,
        }
    }

    fn mint_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        key
    }

    fn attach(&mut self, parent: NodeKey, key: NodeKey, content: NodeContent) -> Result<(), Error> {
        let entry = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| anyhow!("No such parent node {parent:?}"))?;
        entry.children.push(key);
        self.nodes.insert(
            key,
            NodeEntry {
                content,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Insert an element under `parent` and return its key.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    pub fn insert_element(&mut self, parent: NodeKey, tag: &str) -> Result<NodeKey, Error> {
        let key = self.mint_key();
        let lowercase_tag = tag.to_ascii_lowercase();
        self.attach(
            parent,
            key,
            NodeContent::Element {
                tag: lowercase_tag.clone(),
                attrs: HashMap::new(),
            },
        )?;
        self.tag_index.entry(lowercase_tag).or_default().push(key);
        Ok(key)
    }

    /// Insert a text node under `parent` and return its key.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    pub fn insert_text(&mut self, parent: NodeKey, text: &str) -> Result<NodeKey, Error> {
        let key = self.mint_key();
        self.attach(parent, key, NodeContent::Text(text.to_owned()))?;
        Ok(key)
    }

    /// Set an attribute on an element, keeping the id index in sync.
    /// Missing nodes and text nodes are ignored.
    pub fn set_attr(&mut self, node: NodeKey, name: &str, value: &str) {
        let Some(entry) = self.nodes.get_mut(&node) else {
            trace!("set_attr on unknown node {node:?}");
            return;
        };
        let NodeContent::Element { attrs, .. } = &mut entry.content else {
            return;
        };
        if name == "id" {
            if let Some(previous) = attrs.get("id") {
                if self.id_index.get(previous) == Some(&node) {
                    self.id_index.remove(previous);
                }
            }
            self.id_index.insert(value.to_owned(), node);
        }
        attrs.insert(name.to_owned(), value.to_owned());
    }

    /// Remove a node and its descendants from the tree and all indices.
    pub fn remove_node(&mut self, node: NodeKey) {
        let Some(entry) = self.nodes.remove(&node) else {
            return;
        };
        for child in entry.children {
            self.remove_node(child);
        }
        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.nodes.get_mut(&parent) {
                parent_entry.children.retain(|key| *key != node);
            }
        }
        if let NodeContent::Element { tag, attrs } = entry.content {
            if let Some(list) = self.tag_index.get_mut(&tag) {
                list.retain(|key| *key != node);
            }
            if let Some(id) = attrs.get("id") {
                if self.id_index.get(id) == Some(&node) {
                    self.id_index.remove(id);
                }
            }
        }
    }

    /// Locate a node by a stable selector: `#id` or a tag name.
    /// Tag lookups return the first match in insertion order.
    #[must_use]
    pub fn query_selector(&self, selector: &str) -> Option<NodeKey> {
        if let Some(id) = selector.strip_prefix('#') {
            return self.id_index.get(id).copied();
        }
        self.tag_index
            .get(&selector.to_ascii_lowercase())
            .and_then(|list| list.first().copied())
    }

    /// Children of a node, in insertion order. Unknown nodes have none.
    #[must_use]
    pub fn children(&self, node: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(&node)
            .map_or(&[], |entry| entry.children.as_slice())
    }

    /// Tag name of an element node, lowercase.
    #[must_use]
    pub fn tag(&self, node: NodeKey) -> Option<&str> {
        match self.nodes.get(&node)?.content {
            NodeContent::Element { ref tag, .. } => Some(tag.as_str()),
            NodeContent::Text(_) => None,
        }
    }

    /// Text content of a text node.
    #[must_use]
    pub fn text(&self, node: NodeKey) -> Option<&str> {
        match self.nodes.get(&node)?.content {
            NodeContent::Text(ref text) => Some(text.as_str()),
            NodeContent::Element { .. } => None,
        }
    }

    /// Attribute value of an element node.
    #[must_use]
    pub fn attr(&self, node: NodeKey, name: &str) -> Option<&str> {
        match self.nodes.get(&node)?.content {
            NodeContent::Element { ref attrs, .. } => attrs.get(name).map(String::as_str),
            NodeContent::Text(_) => None,
        }
    }

    /// Synchronously-readable current readiness phase.
    #[must_use]
    pub fn phase(&self) -> DocumentPhase {
        *self.phase.borrow()
    }

    /// Fire the one-shot `Loading -> Ready` transition. Further calls are
    /// no-ops; the phase never moves back to `Loading`.
    pub fn mark_ready(&mut self) {
        if *self.phase.borrow() == DocumentPhase::Loading {
            trace!("HostDocument: structure ready");
            self.phase.send_replace(DocumentPhase::Ready);
        }
    }

    /// Subscribe to the readiness signal.
    #[must_use]
    pub fn subscribe(&self) -> ReadinessSignal {
        ReadinessSignal::new(self.phase.subscribe())
    }
}

impl Default for HostDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::HostDocument;
    use crate::NodeKey;
    use crate::readiness::DocumentPhase;

    fn document_with_nav_slot() -> (HostDocument, NodeKey) {
        let mut doc = HostDocument::new();
        let body = doc.insert_element(NodeKey::ROOT, "body").expect("body");
        let slot = doc.insert_element(body, "div").expect("slot");
        doc.set_attr(slot, "id", "nav");
        (doc, slot)
    }

    #[test]
    fn selector_lookup_by_id_and_tag() {
        let (doc, slot) = document_with_nav_slot();
        assert_eq!(doc.query_selector("#nav"), Some(slot));
        assert_eq!(doc.query_selector("html"), Some(NodeKey::ROOT));
        assert_eq!(doc.query_selector("BODY"), doc.query_selector("body"));
        assert_eq!(doc.query_selector("#missing"), None);
        assert_eq!(doc.query_selector("nav"), None);
    }

    #[test]
    fn id_reassignment_keeps_the_index_coherent() {
        let (mut doc, slot) = document_with_nav_slot();
        doc.set_attr(slot, "id", "chrome");
        assert_eq!(doc.query_selector("#nav"), None);
        assert_eq!(doc.query_selector("#chrome"), Some(slot));
    }

    #[test]
    fn remove_node_detaches_the_whole_subtree() {
        let (mut doc, slot) = document_with_nav_slot();
        let nav = doc.insert_element(slot, "nav").expect("nav");
        let anchor = doc.insert_element(nav, "a").expect("anchor");
        doc.set_attr(anchor, "id", "home-link");

        doc.remove_node(slot);
        assert_eq!(doc.query_selector("#nav"), None);
        assert_eq!(doc.query_selector("#home-link"), None);
        assert_eq!(doc.query_selector("nav"), None);
        assert!(doc.tag(anchor).is_none());
    }

    #[test]
    fn insert_under_missing_parent_is_an_error() {
        let mut doc = HostDocument::new();
        assert!(doc.insert_element(NodeKey(999), "div").is_err());
        assert!(doc.insert_text(NodeKey(999), "orphan").is_err());
    }

    #[test]
    fn mark_ready_is_one_shot() {
        let (mut doc, _slot) = document_with_nav_slot();
        assert_eq!(doc.phase(), DocumentPhase::Loading);
        doc.mark_ready();
        assert_eq!(doc.phase(), DocumentPhase::Ready);
        doc.mark_ready();
        assert_eq!(doc.phase(), DocumentPhase::Ready);
    }

    #[tokio::test]
    async fn subscribe_sees_the_transition() {
        let (mut doc, _slot) = document_with_nav_slot();
        let mut signal = doc.subscribe();
        assert_eq!(signal.current(), DocumentPhase::Loading);
        doc.mark_ready();
        signal.wait_ready().await;
        assert_eq!(signal.current(), DocumentPhase::Ready);
    }
}

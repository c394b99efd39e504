mod cloning;
mod printing;

use anyhow::{Error, anyhow, bail};
use indextree::{Arena, NodeId};
use log::trace;
use smallvec::SmallVec;

use crate::observer::{MutationBatch, MutationObserver, ObserveOptions, ObserverId, Registrations};
use crate::record::MutationRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            attrs: SmallVec::new(),
        }
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: SmallVec::new(),
        }
    }
}

/// An arena-backed document tree.
///
/// A removed node stays addressable (and can be inserted again) until it is
/// [discarded](Self::discard). Discarded handles are stamped stale by the
/// arena, so every query on them answers as for an unknown node.
pub struct Document {
    dom: Arena<DOMNode>,
    root: NodeId,
    observers: Registrations,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the document node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        Self {
            root: dom.new_node(DOMNode::default()),
            dom,
            observers: Registrations::default(),
        }
    }

    /// `#document > html > (head, body)`.
    pub fn with_skeleton() -> Self {
        let mut doc = Self::new();
        let html = doc.dom.new_node(DOMNode::element("html"));
        let head = doc.dom.new_node(DOMNode::element("head"));
        let body = doc.dom.new_node(DOMNode::element("body"));
        // Freshly created, detached nodes: these appends cannot fail.
        doc.root.append(html, &mut doc.dom);
        html.append(head, &mut doc.dom);
        html.append(body, &mut doc.dom);
        doc
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The `head` element of the `html` document element, if present.
    pub fn head(&self) -> Option<NodeId> {
        self.html_child("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.html_child("body")
    }

    fn html_child(&self, tag: &str) -> Option<NodeId> {
        let html = self
            .children(self.root)
            .find(|child| self.is_element_named(*child, "html"))?;
        self.children(html)
            .find(|child| self.is_element_named(*child, tag))
    }

    // -----------------------
    // Queries
    // -----------------------

    pub fn node(&self, id: NodeId) -> Option<&DOMNode> {
        self.dom.get(id).map(indextree::Node::get)
    }

    fn node_checked(&self, id: NodeId) -> Result<&DOMNode, Error> {
        self.node(id)
            .ok_or_else(|| anyhow!("node {id:?} does not belong to this document"))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Lowercase tag name for elements, `None` for any other node.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let node = self.node(id)?;
        node.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id)?.parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dom
            .get(id)
            .map(|_| id.children(&self.dom))
            .into_iter()
            .flatten()
    }

    /// Siblings after `id`, nearest first.
    pub fn next_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dom
            .get(id)
            .map(|_| id.following_siblings(&self.dom).skip(1))
            .into_iter()
            .flatten()
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dom
            .get(id)
            .map(|_| id.descendants(&self.dom))
            .into_iter()
            .flatten()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id)?.next_sibling()
    }

    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).position(|child| child == id)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.dom.get(node).is_some() && node.ancestors(&self.dom).any(|id| id == ancestor)
    }

    /// Whether `id` is reachable from the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Concatenated data of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeKind::Text { text }) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Elements below `root` whose tag is in `tags`, in document order,
    /// without descending into a match.
    pub fn outermost_elements_named(&self, root: NodeId, tags: &[String]) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            if tags.iter().any(|tag| self.is_element_named(id, tag)) {
                found.push(id);
                continue;
            }
            let mark = stack.len();
            stack.extend(self.children(id));
            stack[mark..].reverse();
        }
        found
    }

    // -----------------------
    // Construction
    // -----------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom.new_node(DOMNode::element(tag))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::with_kind(NodeKind::Text {
            text: text.to_owned(),
        }))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::with_kind(NodeKind::Comment {
            text: text.to_owned(),
        }))
    }

    pub(crate) fn new_detached(&mut self, node: DOMNode) -> NodeId {
        self.dom.new_node(node)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. A child attached elsewhere is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), Error> {
        self.check_insertion(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                bail!("reference node {reference:?} is not a child of {parent:?}");
            }
        }
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };

        if let Some(old_parent) = self.parent(child) {
            self.detach_recorded(old_parent, child);
        }
        match reference {
            Some(reference) => reference
                .checked_insert_before(child, &mut self.dom)
                .map_err(|err| anyhow!("failed to insert {child:?}: {err:?}"))?,
            None => parent
                .checked_append(child, &mut self.dom)
                .map_err(|err| anyhow!("failed to append {child:?}: {err:?}"))?,
        }

        let previous_sibling = self.dom[child].previous_sibling();
        let next_sibling = self.dom[child].next_sibling();
        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
            previous_sibling,
            next_sibling,
        });
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if self.parent(child) != Some(parent) {
            bail!("node {child:?} is not a child of {parent:?}");
        }
        self.detach_recorded(parent, child);
        Ok(())
    }

    /// Free a detached subtree. Its handles become unknown to this document.
    pub fn discard(&mut self, id: NodeId) -> Result<(), Error> {
        self.node_checked(id)?;
        if id == self.root {
            bail!("the document node cannot be discarded");
        }
        if self.parent(id).is_some() {
            bail!("node {id:?} is still attached");
        }
        id.remove_subtree(&mut self.dom);
        Ok(())
    }

    /// Replace `old_child` of `parent` by `new_child` (DOM argument order).
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), Error> {
        if self.parent(old_child) != Some(parent) {
            bail!("node {old_child:?} is not a child of {parent:?}");
        }
        if new_child == old_child {
            return Ok(());
        }
        self.check_insertion(parent, new_child)?;

        if let Some(old_parent) = self.parent(new_child) {
            self.detach_recorded(old_parent, new_child);
        }
        let previous_sibling = self.dom[old_child].previous_sibling();
        let next_sibling = self.dom[old_child].next_sibling();
        old_child
            .checked_insert_before(new_child, &mut self.dom)
            .map_err(|err| anyhow!("failed to insert {new_child:?}: {err:?}"))?;
        old_child.detach(&mut self.dom);

        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added: vec![new_child],
            removed: vec![old_child],
            previous_sibling,
            next_sibling,
        });
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), Error> {
        let name = name.to_ascii_lowercase();
        let node = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("node {id:?} does not belong to this document"))?
            .get_mut();
        if !matches!(node.kind, NodeKind::Element { .. }) {
            bail!("attributes can only be set on elements");
        }
        let old_value = match node.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, current)) => Some(core::mem::replace(current, value.to_owned())),
            None => {
                node.attrs.push((name.clone(), value.to_owned()));
                None
            }
        };
        self.queue_record(MutationRecord::Attributes {
            target: id,
            name,
            old_value,
        });
        Ok(())
    }

    /// Remove an attribute. Removing an absent attribute changes nothing.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), Error> {
        let name = name.to_ascii_lowercase();
        let node = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("node {id:?} does not belong to this document"))?
            .get_mut();
        let Some(index) = node.attrs.iter().position(|(key, _)| *key == name) else {
            return Ok(());
        };
        let (_, old) = node.attrs.remove(index);
        self.queue_record(MutationRecord::Attributes {
            target: id,
            name,
            old_value: Some(old),
        });
        Ok(())
    }

    /// Replace the data of a text or comment node.
    pub fn set_text(&mut self, id: NodeId, data: &str) -> Result<(), Error> {
        let node = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("node {id:?} does not belong to this document"))?
            .get_mut();
        let old_value = match &mut node.kind {
            NodeKind::Text { text } | NodeKind::Comment { text } => {
                core::mem::replace(text, data.to_owned())
            }
            _ => bail!("character data can only be set on text or comment nodes"),
        };
        self.queue_record(MutationRecord::CharacterData {
            target: id,
            old_value: Some(old_value),
        });
        Ok(())
    }

    /// Replace every child of `id` by a single text node (none when `text`
    /// is empty). On text and comment nodes this sets their data instead.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        match self.node_checked(id)?.kind {
            NodeKind::Text { .. } | NodeKind::Comment { .. } => return self.set_text(id, text),
            NodeKind::Document | NodeKind::Element { .. } => {}
        }
        let removed: Vec<NodeId> = self.children(id).collect();
        for child in &removed {
            child.detach(&mut self.dom);
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            id.checked_append(text_node, &mut self.dom)
                .map_err(|err| anyhow!("failed to append text: {err:?}"))?;
            added.push(text_node);
        }
        if added.is_empty() && removed.is_empty() {
            return Ok(());
        }
        self.queue_record(MutationRecord::ChildList {
            target: id,
            added,
            removed,
            previous_sibling: None,
            next_sibling: None,
        });
        Ok(())
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let parent_kind = &self.node_checked(parent)?.kind;
        let child_kind = &self.node_checked(child)?.kind;
        if matches!(parent_kind, NodeKind::Text { .. } | NodeKind::Comment { .. }) {
            bail!("text and comment nodes cannot have children");
        }
        if matches!(child_kind, NodeKind::Document) {
            bail!("a document node cannot be inserted");
        }
        if self.contains(child, parent) {
            bail!("cannot insert {child:?} into its own subtree");
        }
        Ok(())
    }

    fn detach_recorded(&mut self, parent: NodeId, child: NodeId) {
        let previous_sibling = self.dom[child].previous_sibling();
        let next_sibling = self.dom[child].next_sibling();
        child.detach(&mut self.dom);
        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
            previous_sibling,
            next_sibling,
        });
    }

    // -----------------------
    // Observation
    // -----------------------

    /// Watch edits made at or (with `subtree`) below `root`.
    pub fn observe(
        &mut self,
        root: NodeId,
        options: ObserveOptions,
    ) -> Result<MutationObserver, Error> {
        self.node_checked(root)?;
        options.validate()?;
        Ok(self.observers.register(root, options))
    }

    /// Cancel a registration and drop its undelivered records.
    pub fn disconnect(&mut self, observer: &mut MutationObserver) {
        self.observers.unregister(observer.id());
        observer.disconnect();
    }

    /// Records queued for `id` that have not been delivered yet.
    pub fn take_records(&mut self, id: ObserverId) -> MutationBatch {
        self.observers.take_pending(id)
    }

    /// Delivery checkpoint: hand every observer its queued records as one
    /// batch. Returns the number of batches delivered.
    pub fn notify_observers(&mut self) -> usize {
        self.observers.deliver()
    }

    fn queue_record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let path: SmallVec<NodeId, 16> = record.target().ancestors(&self.dom).collect();
        trace!("queued {:?} on {:?}", record.kind(), record.target());
        self.observers.queue(&path, &record);
    }
}

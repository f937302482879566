//! The DOM node model the sanitization engine walks and mutates.
//!
//! This is a minimal, single-threaded tree: `Rc<RefCell<Node>>` children with
//! a `Weak` parent back-reference. Nothing here enforces any security policy —
//! that is the traversal core's job (`crate::traverse`). The tree is built by
//! the `html`/`xhtml` tree sinks and only ever lives for the duration of one
//! `Sanitizer` call.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

pub type NodeRef = Rc<RefCell<Node>>;
pub type WeakNodeRef = Weak<RefCell<Node>>;

/// Opaque per-node identity, stable for the lifetime of one sanitize call.
/// Used as the key for the namespace map (spec §3, "Namespace map ... keyed
/// by element identity").
pub type NodeId = u64;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A qualified name: optional namespace prefix, namespace URI (empty string
/// for "no namespace"), and local name. Mirrors `html5ever::QualName` in
/// shape so the HTML/XHTML tree sinks can convert directly from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualName {
    pub prefix: Option<String>,
    pub ns: String,
    pub local: String,
}

impl QualName {
    pub fn new(prefix: Option<String>, ns: impl Into<String>, local: impl Into<String>) -> Self {
        Self { prefix, ns: ns.into(), local: local.into() }
    }

    /// An attribute or tag name with no namespace, as produced by HTML
    /// parsing of ordinary (non-`xlink:`/`xml:`) names.
    pub fn plain(local: impl Into<String>) -> Self {
        Self { prefix: None, ns: String::new(), local: local.into() }
    }
}

impl fmt::Display for QualName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{p}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub name: QualName,
    pub value: String,
}

impl Attr {
    pub fn new(name: QualName, value: impl Into<String>) -> Self {
        Self { name, value: value.into() }
    }
}

/// An element's tag name and its attributes, in parse order.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// `name.local` is the tag name; `name.ns` carries the *element*
    /// namespace URI (HTML/SVG/MathML/custom), tracked independently by
    /// `crate::namespace` but cached here for convenience.
    pub name: QualName,
    pub attrs: Vec<Attr>,
}

impl ElementData {
    pub fn tag(&self) -> &str {
        &self.name.local
    }

    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attrs.iter().find(|a| a.name.local == local_name).map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, local_name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.local == local_name)
    }

    pub fn set_attr(&mut self, local_name: &str, value: impl Into<String>) {
        if let Some(a) = self.attrs.iter_mut().find(|a| a.name.local == local_name) {
            a.value = value.into();
        } else {
            self.attrs.push(Attr::new(QualName::plain(local_name), value));
        }
    }

    pub fn remove_attr(&mut self, local_name: &str) -> Option<Attr> {
        let idx = self.attrs.iter().position(|a| a.name.local == local_name)?;
        Some(self.attrs.remove(idx))
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype { name: String, public_id: String, system_id: String },
    Element(ElementData),
    Text(String),
    /// Raw CDATA-ish content for `<style>`/`<script>`-like containers (spec
    /// §3 `DataNode`). Populated when a tree sink explicitly marks a text
    /// child as raw data (see `html::tree_sink`).
    RawData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

pub struct Node {
    pub id: NodeId,
    pub data: NodeData,
    pub parent: Option<WeakNodeRef>,
    pub children: Vec<NodeRef>,
}

impl Node {
    pub fn new(data: NodeData) -> NodeRef {
        Rc::new(RefCell::new(Node {
            id: next_node_id(),
            data,
            parent: None,
            children: Vec::new(),
        }))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag())
    }

    /// Concatenated text content of this subtree (spec §4.4 mXSS leaf check
    /// uses this).
    pub fn text_content(&self) -> String {
        match &self.data {
            NodeData::Text(t) | NodeData::RawData(t) => t.clone(),
            NodeData::Element(_) | NodeData::Document => {
                let mut out = String::new();
                for child in &self.children {
                    out.push_str(&child.borrow().text_content());
                }
                out
            }
            _ => String::new(),
        }
    }
}

/// Append `child` to the end of `parent`'s children, fixing up the parent
/// pointer. The only mutation primitive the tree sinks and traversal core
/// need beyond direct field access.
pub fn append_child(parent: &NodeRef, child: NodeRef) {
    child.borrow_mut().parent = Some(Rc::downgrade(parent));
    parent.borrow_mut().children.push(child);
}

pub fn insert_before(parent: &NodeRef, sibling: &NodeRef, new_node: NodeRef) {
    new_node.borrow_mut().parent = Some(Rc::downgrade(parent));
    let mut parent_mut = parent.borrow_mut();
    let idx = parent_mut
        .children
        .iter()
        .position(|c| Rc::ptr_eq(c, sibling))
        .unwrap_or(parent_mut.children.len());
    parent_mut.children.insert(idx, new_node);
}

/// Detach `node` from its parent's child list. The node keeps its own
/// children; callers that want to drop the subtree simply let the `Rc` go
/// out of scope afterwards.
pub fn detach(node: &NodeRef) {
    let parent = node.borrow().parent.clone().and_then(|w| w.upgrade());
    if let Some(parent) = parent {
        parent.borrow_mut().children.retain(|c| !Rc::ptr_eq(c, node));
    }
    node.borrow_mut().parent = None;
}

/// Splice `node`'s children into its parent, at `node`'s former position,
/// then detach `node` itself. Returns the first spliced child, if any —
/// traversal resumes there (spec §4.4 "unwrap").
pub fn unwrap_node(node: &NodeRef) -> Option<NodeRef> {
    let parent = node.borrow().parent.clone().and_then(|w| w.upgrade())?;
    let children: Vec<NodeRef> = node.borrow_mut().children.drain(..).collect();
    {
        let mut parent_mut = parent.borrow_mut();
        let idx = parent_mut.children.iter().position(|c| Rc::ptr_eq(c, node)).unwrap_or(parent_mut.children.len());
        for (i, child) in children.iter().enumerate() {
            child.borrow_mut().parent = Some(Rc::downgrade(&parent));
            parent_mut.children.insert(idx + i, child.clone());
        }
        parent_mut.children.retain(|c| !Rc::ptr_eq(c, node));
    }
    node.borrow_mut().parent = None;
    children.into_iter().next()
}

pub fn parent_of(node: &NodeRef) -> Option<NodeRef> {
    node.borrow().parent.clone().and_then(|w| w.upgrade())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_sets_parent_pointer() {
        let root = Node::new(NodeData::Document);
        let child = Node::new(NodeData::Element(ElementData { name: QualName::plain("div"), attrs: vec![] }));
        append_child(&root, child.clone());
        assert!(Rc::ptr_eq(&parent_of(&child).unwrap(), &root));
        assert_eq!(root.borrow().children.len(), 1);
    }

    #[test]
    fn unwrap_splices_children_and_detaches() {
        let root = Node::new(NodeData::Document);
        let span = Node::new(NodeData::Element(ElementData { name: QualName::plain("span"), attrs: vec![] }));
        let text = Node::new(NodeData::Text("hi".into()));
        append_child(&root, span.clone());
        append_child(&span, text.clone());

        let first = unwrap_node(&span).unwrap();
        assert!(Rc::ptr_eq(&first, &text));
        assert!(parent_of(&span).is_none());
        assert_eq!(root.borrow().children.len(), 1);
        assert!(Rc::ptr_eq(&root.borrow().children[0], &text));
    }

    #[test]
    fn detach_removes_from_parent_children() {
        let root = Node::new(NodeData::Document);
        let child = Node::new(NodeData::Text("x".into()));
        append_child(&root, child.clone());
        detach(&child);
        assert!(root.borrow().children.is_empty());
        assert!(parent_of(&child).is_none());
    }
}

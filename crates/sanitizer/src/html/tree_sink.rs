//! `html5ever::TreeSink` implementation that builds a full, unfiltered
//! `dom::node` tree.
//!
//! Unlike the teacher's original sink, nothing here consults an allow list:
//! every element, comment, text node and processing instruction the parser
//! hands us gets built. Keep/drop/unwrap decisions are the traversal core's
//! job (spec §4.4), made only once the whole tree — and hence every
//! element's final set of descendants — exists.

use std::borrow::Cow;
use std::collections::HashMap;

use html5ever::{
    namespace_url,
    tendril::StrTendril,
    tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink},
    Attribute as HtmlAttribute, ExpandedName, LocalName, Namespace as Html5Namespace,
    QualName as Html5everQualName,
};

use crate::dom::{
    append_child, detach, insert_before, Attr, ElementData, Node, NodeData, NodeId, NodeRef,
    QualName,
};

fn convert_name(name: &Html5everQualName) -> QualName {
    let prefix = name.prefix.as_ref().map(|p| p.to_string());
    QualName::new(prefix, name.ns.to_string(), name.local.to_string())
}

fn convert_attrs(attrs: Vec<HtmlAttribute>) -> Vec<Attr> {
    attrs
        .into_iter()
        .map(|a| Attr { name: convert_name(&a.name), value: a.value.to_string() })
        .collect()
}

/// Every mutating `TreeSink` method takes `&mut self`, so the sink's own
/// bookkeeping (quirks mode, template contents, the expanded-name cache
/// `elem_name` needs) can live in plain fields rather than `RefCell`s.
pub struct HtmlTreeSink {
    document: NodeRef,
    quirks_mode: QuirksMode,
    template_contents: HashMap<NodeId, NodeRef>,
    /// Atom-interned `(ns, local)` per element, so `elem_name` can hand
    /// html5ever's tree builder a borrow it needs for scope-checking
    /// algorithms without reaching through a `RefCell`.
    names: HashMap<NodeId, (Html5Namespace, LocalName)>,
    /// Fallback `(ns, local)` returned by `elem_name` for handles with no
    /// recorded name, stored so the borrow returned can be tied to `&self`.
    default_name: (Html5Namespace, LocalName),
}

impl HtmlTreeSink {
    pub fn new() -> Self {
        Self {
            document: Node::new(NodeData::Document),
            quirks_mode: QuirksMode::NoQuirks,
            template_contents: HashMap::new(),
            names: HashMap::new(),
            default_name: (markup5ever::ns!(html), markup5ever::local_name!("")),
        }
    }

    pub fn finish_tree(self) -> (NodeRef, QuirksMode) {
        (self.document, self.quirks_mode)
    }

    fn append_common(&self, parent: &NodeRef, child: NodeOrText<NodeRef>) {
        match child {
            NodeOrText::AppendNode(node) => append_child(parent, node),
            NodeOrText::AppendText(text) => {
                if let Some(last) = parent.borrow().children.last() {
                    if let NodeData::Text(existing) = &mut last.borrow_mut().data {
                        existing.push_str(&text);
                        return;
                    }
                }
                append_child(parent, Node::new(NodeData::Text(text.to_string())));
            }
        }
    }
}

impl Default for HtmlTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSink for HtmlTreeSink {
    type Output = (NodeRef, QuirksMode);
    type Handle = NodeRef;

    fn finish(self) -> Self::Output {
        self.finish_tree()
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        tracing::debug!(%msg, "html parse error (recovered)");
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
    }

    fn get_document(&mut self) -> Self::Handle {
        self.document.clone()
    }

    fn get_template_contents(&mut self, target: &Self::Handle) -> Self::Handle {
        let id = target.borrow().id;
        self.template_contents.entry(id).or_insert_with(|| Node::new(NodeData::Document)).clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        std::rc::Rc::ptr_eq(x, y)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        let id = target.borrow().id;
        match self.names.get(&id) {
            Some((ns, local)) => ExpandedName { ns, local },
            None => ExpandedName { ns: &self.default_name.0, local: &self.default_name.1 },
        }
    }

    fn create_element(
        &mut self,
        name: Html5everQualName,
        attrs: Vec<HtmlAttribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let data = ElementData { name: convert_name(&name), attrs: convert_attrs(attrs) };
        let node = Node::new(NodeData::Element(data));
        self.names.insert(node.borrow().id, (name.ns, name.local));
        node
    }

    fn create_comment(&mut self, text: StrTendril) -> Self::Handle {
        Node::new(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Node::new(NodeData::ProcessingInstruction { target: target.to_string(), data: data.to_string() })
    }

    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.append_common(parent, child);
    }

    fn append_before_sibling(&mut self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let Some(parent) = crate::dom::parent_of(sibling) else { return };
        match new_node {
            NodeOrText::AppendNode(node) => insert_before(&parent, sibling, node),
            NodeOrText::AppendText(text) => {
                insert_before(&parent, sibling, Node::new(NodeData::Text(text.to_string())));
            }
        }
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if crate::dom::parent_of(element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append_common(prev_element, child);
        }
    }

    fn append_doctype_to_document(&mut self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let doctype = Node::new(NodeData::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
        append_child(&self.document, doctype);
    }

    fn add_attrs_if_missing(&mut self, target: &Self::Handle, attrs: Vec<HtmlAttribute>) {
        let mut node = target.borrow_mut();
        let Some(element) = node.as_element_mut() else { return };
        for attr in convert_attrs(attrs) {
            if !element.has_attr(&attr.name.local) {
                element.attrs.push(attr);
            }
        }
    }

    fn remove_from_parent(&mut self, target: &Self::Handle) {
        detach(target);
    }

    fn reparent_children(&mut self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children: Vec<NodeRef> = node.borrow().children.clone();
        for child in children {
            detach(&child);
            append_child(new_parent, child);
        }
    }

    fn mark_script_already_started(&mut self, _node: &Self::Handle) {}

    fn set_current_line(&mut self, _line_number: u64) {}

    fn pop(&mut self, _handle: &Self::Handle) {}
}

pub fn create_html_sink() -> HtmlTreeSink {
    HtmlTreeSink::new()
}

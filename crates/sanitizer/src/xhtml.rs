//! XHTML parsing (spec §4.2 "XHTML mode", §6): hands input to `xml5ever`,
//! which builds the tree via [`XmlTreeSink`]. Unlike HTML mode, none of the
//! §4.2 string-level pre-processing rewrites apply — `xml5ever` requires
//! well-formed input and has no foreign-content quirks to work around.

use std::borrow::Cow;
use std::collections::HashMap;

use markup5ever::interface::{
    Attribute as XmlAttribute, ElementFlags, ExpandedName, NodeOrText, QualName as XmlQualName,
    QuirksMode,
};
use markup5ever::{local_name, namespace_url, ns, LocalName as XmlLocalName, Namespace as XmlNamespace};
use xml5ever::driver::{parse_document, XmlParseOpts};
use xml5ever::tendril::{StrTendril, TendrilSink};
use xml5ever::tree_builder::TreeSink;

use crate::dom::{
    append_child, detach, insert_before, parent_of, Attr, ElementData, Node, NodeData, NodeId,
    NodeRef, QualName,
};
use crate::error::SanitizeResult;

fn convert_name(name: &XmlQualName) -> QualName {
    QualName::new(
        name.prefix.as_ref().map(|p| p.to_string()),
        name.ns.to_string(),
        name.local.to_string(),
    )
}

fn convert_attrs(attrs: Vec<XmlAttribute>) -> Vec<Attr> {
    attrs.into_iter().map(|a| Attr::new(convert_name(&a.name), a.value.to_string())).collect()
}

/// Wraps `input` per spec §4.2's XHTML-mode rule: a whole document gets a
/// synthetic `<html>`/`<head>`/`<body>` shell in the HTML namespace; a
/// fragment gets a synthetic `<template>` root in the configured namespace.
pub fn wrap_for_xhtml(input: &str, whole_document: bool, namespace_uri: &str) -> String {
    if whole_document {
        format!(r#"<html xmlns="{}"><head></head><body>{input}</body></html>"#, crate::namespace::HTML_NS)
    } else {
        format!(r#"<template xmlns="{namespace_uri}">{input}</template>"#)
    }
}

struct XmlTreeSink {
    document: NodeRef,
    names: HashMap<NodeId, (XmlNamespace, XmlLocalName)>,
    template_contents: HashMap<NodeId, NodeRef>,
    default_name: (XmlNamespace, XmlLocalName),
}

impl XmlTreeSink {
    fn new() -> Self {
        Self {
            document: Node::new(NodeData::Document),
            names: HashMap::new(),
            template_contents: HashMap::new(),
            default_name: (ns!(), local_name!("")),
        }
    }

    fn append_common(&mut self, parent: &NodeRef, child: NodeOrText<NodeRef>) {
        match child {
            NodeOrText::AppendNode(node) => append_child(parent, node),
            NodeOrText::AppendText(text) => {
                let n = Node::new(NodeData::Text(text.to_string()));
                append_child(parent, n);
            }
        }
    }
}

impl TreeSink for XmlTreeSink {
    type Handle = NodeRef;
    type Output = NodeRef;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        tracing::debug!(%msg, "xml parse error");
    }

    fn get_document(&mut self) -> Self::Handle {
        self.document.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        let id = target.borrow().id;
        match self.names.get(&id) {
            Some((namespace, local)) => ExpandedName { ns: namespace, local },
            None => ExpandedName { ns: &self.default_name.0, local: &self.default_name.1 },
        }
    }

    fn create_element(
        &mut self,
        name: XmlQualName,
        attrs: Vec<XmlAttribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let node = Node::new(NodeData::Element(ElementData {
            name: convert_name(&name),
            attrs: convert_attrs(attrs),
        }));
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

    fn get_template_contents(&mut self, target: &Self::Handle) -> Self::Handle {
        let id = target.borrow().id;
        self.template_contents.entry(id).or_insert_with(|| Node::new(NodeData::Document)).clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        std::rc::Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&mut self, _mode: QuirksMode) {}

    fn append_before_sibling(&mut self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let Some(parent) = parent_of(sibling) else { return };
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
        if parent_of(element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append_common(prev_element, child);
        }
    }

    fn add_attrs_if_missing(&mut self, target: &Self::Handle, attrs: Vec<XmlAttribute>) {
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

    fn append_doctype_to_document(&mut self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let doctype = Node::new(NodeData::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
        append_child(&self.document.clone(), doctype);
    }

    fn pop(&mut self, _node: &Self::Handle) {}

    fn complete_script(&mut self, _node: &Self::Handle) -> xml5ever::tree_builder::NextParserState {
        xml5ever::tree_builder::NextParserState::Continue
    }
}

/// Parse already-wrapped XHTML markup into a node tree. Detaches the
/// synthetic root's own node from the document so the caller sees only the
/// `<html>`/`<template>` shell as the traversal root.
pub fn parse_xhtml(wrapped: &str) -> SanitizeResult<NodeRef> {
    let sink = XmlTreeSink::new();
    let document = parse_document(sink, XmlParseOpts::default()).one(wrapped);
    Ok(document)
}

/// Unwrap a parsed `<template>` fragment root back to its children, mirroring
/// `html::parse_html_fragment`'s contract.
pub fn unwrap_template_root(document: &NodeRef) -> NodeRef {
    let template = document
        .borrow()
        .children
        .iter()
        .find(|c| c.borrow().tag_name() == Some("template"))
        .cloned();
    match template {
        Some(t) => {
            detach(&t);
            t
        }
        None => document.clone(),
    }
}

//! Serialization back to markup (spec §4.6): HTML and XHTML output modes.

use crate::config::MediaType;
use crate::defaults::{SVG_CAMEL_CASE, VOID_ELEMENTS};
use crate::dom::{NodeData, NodeRef};
use crate::namespace::HTML_NS;

fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<isindex>` is the one element whose `name`/`label` attributes the
/// serializer swaps back (spec §4.6 "special fixup for `<isindex>`") —
/// a leftover of how browsers historically round-tripped the obsolete
/// element through its `prompt` form.
fn isindex_attr_name(original: &str) -> &str {
    match original {
        "name" => "label",
        "label" => "name",
        other => other,
    }
}

fn camel_case(tag_or_attr: &str) -> String {
    SVG_CAMEL_CASE.get(tag_or_attr).map(|s| s.to_string()).unwrap_or_else(|| tag_or_attr.to_string())
}

/// Serialize `node` (and its subtree) as HTML (spec §4.6 "HTML mode").
pub fn serialize_html(node: &NodeRef) -> String {
    let mut out = String::new();
    serialize_html_into(node, &mut out);
    out
}

fn serialize_html_into(node: &NodeRef, out: &mut String) {
    let n = node.borrow();
    match &n.data {
        NodeData::Document => {
            for child in &n.children {
                serialize_html_into(child, out);
            }
        }
        NodeData::Doctype { name, .. } => {
            out.push_str(&format!("<!DOCTYPE {name}>"));
        }
        NodeData::Text(t) | NodeData::RawData(t) => out.push_str(&escape_text(t)),
        NodeData::Comment(c) => out.push_str(&format!("<!--{c}-->")),
        NodeData::ProcessingInstruction { target, data } => out.push_str(&format!("<?{target} {data}?>")),
        NodeData::Element(el) => {
            let tag_lower = el.tag().to_ascii_lowercase();
            let display_tag = camel_case(&tag_lower);
            let is_isindex = tag_lower == "isindex";

            out.push('<');
            out.push_str(&display_tag);
            for attr in &el.attrs {
                let name_lower = attr.name.local.to_ascii_lowercase();
                let display_name =
                    if is_isindex { isindex_attr_name(&name_lower).to_string() } else { camel_case(&name_lower) };
                out.push(' ');
                out.push_str(&display_name);
                out.push_str("=\"");
                out.push_str(&escape_value(&attr.value));
                out.push('"');
            }

            if VOID_ELEMENTS.contains(tag_lower.as_str()) {
                out.push('>');
                return;
            }
            out.push('>');
            for child in &n.children {
                serialize_html_into(child, out);
            }
            out.push_str("</");
            out.push_str(&display_tag);
            out.push('>');
        }
    }
}

/// Serialize just `node`'s children as HTML, for the mXSS leaf check (spec
/// §4.4 step 1), which needs the innerHTML of a candidate leaf element.
pub fn serialize_inner_html(node: &NodeRef) -> String {
    let mut out = String::new();
    for child in node.borrow().children.clone() {
        serialize_html_into(&child, &mut out);
    }
    out
}

/// Serialize `node` (and its subtree) as XHTML (spec §4.6 "XHTML mode"),
/// threading a namespace context so `xmlns` is only emitted where it
/// actually changes.
pub fn serialize_xhtml(node: &NodeRef) -> String {
    let mut out = String::new();
    serialize_xhtml_into(node, HTML_NS, &mut out);
    out
}

fn serialize_xhtml_into(node: &NodeRef, inherited_ns: &str, out: &mut String) {
    let n = node.borrow();
    match &n.data {
        NodeData::Document => {
            for child in &n.children {
                serialize_xhtml_into(child, inherited_ns, out);
            }
        }
        NodeData::Doctype { name, .. } => out.push_str(&format!("<!DOCTYPE {name}>")),
        NodeData::Text(t) | NodeData::RawData(t) => out.push_str(&escape_text(t)),
        NodeData::Comment(c) => out.push_str(&format!("<!--{c}-->")),
        NodeData::ProcessingInstruction { target, data } => out.push_str(&format!("<?{target} {data}?>")),
        NodeData::Element(el) => {
            let tag = &el.name.local;
            let element_ns = if el.name.ns.is_empty() { inherited_ns.to_string() } else { el.name.ns.clone() };

            out.push('<');
            out.push_str(tag);
            if element_ns != inherited_ns {
                out.push_str(" xmlns=\"");
                out.push_str(&escape_value(&element_ns));
                out.push('"');
            }
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name.to_string());
                out.push_str("=\"");
                out.push_str(&escape_value(&attr.value));
                out.push('"');
            }

            let is_void = VOID_ELEMENTS.contains(tag.to_ascii_lowercase().as_str());
            if n.children.is_empty() || is_void {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &n.children {
                serialize_xhtml_into(child, &element_ns, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

pub fn serialize(node: &NodeRef, media_type: MediaType) -> String {
    match media_type {
        MediaType::Html => serialize_html(node),
        MediaType::Xhtml => serialize_xhtml(node),
    }
}

/// Serialize just `node`'s children, in whichever mode `media_type` calls
/// for (spec §6 `sanitize`/`sanitizeToFragment`: the return value is always
/// a fragment, regardless of the parsing mode that produced the tree).
pub fn serialize_inner(node: &NodeRef, media_type: MediaType) -> String {
    let mut out = String::new();
    match media_type {
        MediaType::Html => {
            for child in node.borrow().children.clone() {
                serialize_html_into(&child, &mut out);
            }
        }
        MediaType::Xhtml => {
            let ns = node.borrow().as_element().map(|e| e.name.ns.clone()).unwrap_or_else(|| HTML_NS.to_string());
            for child in node.borrow().children.clone() {
                serialize_xhtml_into(&child, &ns, &mut out);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{append_child, Attr, ElementData, Node, QualName};

    #[test]
    fn html_void_element_has_no_closing_tag() {
        let img = Node::new(NodeData::Element(ElementData {
            name: QualName::plain("img"),
            attrs: vec![Attr::new(QualName::plain("src"), "x")],
        }));
        assert_eq!(serialize_html(&img), r#"<img src="x">"#);
    }

    #[test]
    fn html_escapes_ampersand_and_angle_brackets_in_text() {
        let text = Node::new(NodeData::Text("a < b & c > d".into()));
        assert_eq!(serialize_html(&text), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn svg_tag_is_recased_to_canonical_camel_case() {
        let fo = Node::new(NodeData::Element(ElementData { name: QualName::plain("foreignobject"), attrs: vec![] }));
        assert_eq!(serialize_html(&fo), "<foreignObject></foreignObject>");
    }

    #[test]
    fn xhtml_emits_xmlns_only_when_namespace_changes() {
        let root = Node::new(NodeData::Element(ElementData {
            name: QualName::new(None, HTML_NS, "html"),
            attrs: vec![],
        }));
        let svg = Node::new(NodeData::Element(ElementData {
            name: QualName::new(None, crate::namespace::SVG_NS, "svg"),
            attrs: vec![],
        }));
        append_child(&root, svg);
        let xml = serialize_xhtml(&root);
        assert!(xml.contains(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#));
        assert!(!xml.starts_with("<html xmlns"));
    }
}

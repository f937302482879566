//! Namespace tracking (spec §4.3).
//!
//! Computes, for each element, a namespace in `{Html, Svg, MathMl, Custom}`
//! using either HTML's foreign-content transition rules or, in XHTML mode,
//! `xmlns` inheritance. The namespace map is a side table keyed by
//! `NodeId`, populated before an element's keep/drop/unwrap decision is
//! evaluated (spec §3 invariant).

use std::collections::HashMap;

use crate::dom::NodeId;

pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
    Custom(String),
}

impl Namespace {
    pub fn uri(&self) -> &str {
        match self {
            Namespace::Html => HTML_NS,
            Namespace::Svg => SVG_NS,
            Namespace::MathMl => MATHML_NS,
            Namespace::Custom(uri) => uri,
        }
    }

    pub fn from_uri(uri: &str) -> Self {
        match uri {
            HTML_NS => Namespace::Html,
            SVG_NS => Namespace::Svg,
            MATHML_NS => Namespace::MathMl,
            other => Namespace::Custom(other.to_string()),
        }
    }
}

/// Elements at which HTML content may appear inside a foreign subtree
/// (spec GLOSSARY "Integration point").
pub const HTML_INTEGRATION_POINTS_SVG: &[&str] = &["foreignobject", "desc", "title"];
pub const MATHML_TEXT_INTEGRATION_POINTS: &[&str] = &["mi", "mo", "mn", "ms", "mtext"];
pub const ANNOTATION_XML: &str = "annotation-xml";

/// `(parentNamespace, parentTagLower, tagLower) -> Namespace`, HTML-mode
/// transition table (spec §4.3 "HTML mode").
pub fn next_namespace_html(
    parent_ns: &Namespace,
    parent_tag: Option<&str>,
    tag: &str,
) -> Namespace {
    match parent_ns {
        Namespace::Html | Namespace::Custom(_) => match tag {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            _ => Namespace::Html,
        },
        Namespace::Svg => {
            if tag == "math" && parent_tag == Some("annotation-xml") {
                Namespace::MathMl
            } else if HTML_INTEGRATION_POINTS_SVG.contains(&parent_tag.unwrap_or(""))
                && !matches!(tag, "svg" | "math")
            {
                Namespace::Html
            } else {
                Namespace::Svg
            }
        }
        Namespace::MathMl => {
            let parent_is_text_integration =
                parent_tag.map(|t| MATHML_TEXT_INTEGRATION_POINTS.contains(&t)).unwrap_or(false);
            if parent_is_text_integration {
                match tag {
                    "svg" => Namespace::Svg,
                    "math" => Namespace::MathMl,
                    _ => Namespace::Html,
                }
            } else if parent_tag == Some(ANNOTATION_XML) {
                if tag == "svg" {
                    Namespace::Svg
                } else {
                    Namespace::MathMl
                }
            } else {
                Namespace::MathMl
            }
        }
    }
}

/// Namespace validity per spec §4.4 step 4: is `(parent_ns, child_ns, tag)`
/// a transition browsers actually allow?
pub fn transition_is_valid(parent_ns: &Namespace, child_ns: &Namespace, tag: &str) -> bool {
    match (parent_ns, child_ns) {
        (Namespace::Html, Namespace::Svg) => tag == "svg",
        (Namespace::Html, Namespace::MathMl) => tag == "math",
        (_, Namespace::Html) => true,
        (Namespace::Svg, Namespace::Svg) => true,
        (Namespace::MathMl, Namespace::MathMl) => true,
        (Namespace::Svg, Namespace::MathMl) => tag == "math",
        (Namespace::MathMl, Namespace::Svg) => tag == "svg",
        (Namespace::Custom(_), _) => true,
        _ => false,
    }
}

/// Per-call side table mapping node identity to its computed namespace.
#[derive(Debug, Default)]
pub struct NamespaceMap {
    map: HashMap<NodeId, Namespace>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn set(&mut self, id: NodeId, ns: Namespace) {
        self.map.insert(id, ns);
    }

    pub fn get(&self, id: NodeId) -> Option<&Namespace> {
        self.map.get(&id)
    }
}

/// XHTML-mode walk state: `(defaultNS, prefixMap)` carried top-down (spec
/// §4.3 "XHTML mode").
#[derive(Debug, Clone)]
pub struct XhtmlNsContext {
    pub default_ns: String,
    pub prefixes: HashMap<String, String>,
}

impl XhtmlNsContext {
    pub fn root(default_ns: impl Into<String>) -> Self {
        Self { default_ns: default_ns.into(), prefixes: HashMap::new() }
    }

    /// Apply `xmlns`/`xmlns:*` declarations found on an element, returning
    /// the updated context to carry to its children.
    pub fn with_declarations<'a>(&self, attrs: impl Iterator<Item = (&'a str, &'a str)>) -> Self {
        let mut next = self.clone();
        for (name, value) in attrs {
            if name == "xmlns" {
                next.default_ns = value.to_string();
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                next.prefixes.insert(prefix.to_string(), value.to_string());
            }
        }
        next
    }

    pub fn resolve(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(p) => self.prefixes.get(p).cloned().unwrap_or_default(),
            None => self.default_ns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_to_svg_root_requires_literal_svg_tag() {
        assert_eq!(next_namespace_html(&Namespace::Html, None, "svg"), Namespace::Svg);
        assert_eq!(next_namespace_html(&Namespace::Html, None, "div"), Namespace::Html);
    }

    #[test]
    fn svg_foreignobject_is_html_integration_point() {
        let ns = next_namespace_html(&Namespace::Svg, Some("foreignobject"), "div");
        assert_eq!(ns, Namespace::Html);
    }

    #[test]
    fn mathml_text_integration_point_allows_svg() {
        let ns = next_namespace_html(&Namespace::MathMl, Some("mtext"), "svg");
        assert_eq!(ns, Namespace::Svg);
    }

    #[test]
    fn transition_validity_matches_foreign_content_rules() {
        assert!(transition_is_valid(&Namespace::Html, &Namespace::Svg, "svg"));
        assert!(!transition_is_valid(&Namespace::Html, &Namespace::Svg, "rect"));
        assert!(transition_is_valid(&Namespace::Svg, &Namespace::Html, "div"));
    }

    #[test]
    fn xhtml_context_inherits_and_overrides_default_ns() {
        let root = XhtmlNsContext::root(HTML_NS);
        let svg_el = root.with_declarations(vec![("xmlns", SVG_NS)].into_iter());
        assert_eq!(svg_el.resolve(None), SVG_NS);
        let child = svg_el.with_declarations(std::iter::empty());
        assert_eq!(child.resolve(None), SVG_NS);
    }
}

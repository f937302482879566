//! HTML parsing (spec §4.2/§6): hands the whole document or a context-free
//! fragment to html5ever, which builds the complete, unfiltered tree via
//! [`tree_sink::HtmlTreeSink`]. No policy decision is made here.

mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, parse_fragment, QualName};
use markup5ever::{local_name, namespace_url, ns};

use crate::dom::NodeRef;
use crate::error::{SanitizeError, SanitizeResult};

/// Parse a complete HTML document into a node tree rooted at `#document`.
pub fn parse_html_document(html: &str) -> SanitizeResult<NodeRef> {
    let sink = tree_sink::create_html_sink();
    let (document, _quirks_mode) = parse_document(sink, ParseOpts::default()).one(html);
    Ok(document)
}

/// Parse `html` as a fragment in the `body` context, returning the fragment
/// root's children already detached from any document wrapper (spec §6
/// "fragment parsing context is always `body`, mirroring the default
/// contract of the reference implementation").
pub fn parse_html_fragment(html: &str) -> SanitizeResult<NodeRef> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let sink = tree_sink::create_html_sink();
    let (document, _quirks_mode) = parse_fragment(sink, ParseOpts::default(), context, vec![]).one(html);
    Ok(document)
}

#[allow(dead_code)]
fn parse_error(msg: impl Into<String>) -> SanitizeError {
    SanitizeError::HtmlParse(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;

    #[test]
    fn parses_simple_document_into_html_head_body() {
        let doc = parse_html_document("<html><body><p>hi</p></body></html>").unwrap();
        let html_el = doc.borrow().children.iter().find_map(|c| {
            let b = c.borrow();
            b.as_element().filter(|e| e.tag() == "html").is_some().then(|| c.clone())
        });
        assert!(html_el.is_some(), "expected an <html> element under the document node");
    }

    #[test]
    fn fragment_parse_yields_body_context_children() {
        let fragment = parse_html_fragment("<b>bold</b> text").unwrap();
        let root = fragment.borrow();
        assert!(!root.children.is_empty());
        let has_bold = root.children.iter().any(|c| {
            matches!(&c.borrow().data, NodeData::Element(e) if e.tag() == "b")
        });
        assert!(has_bold);
    }
}

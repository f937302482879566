//! String-level rewrites applied before HTML parsing (spec §4.2). Each
//! rewrite works around a specific parser/serializer quirk; the behavior to
//! preserve is the resulting tree shape, not the rewrite mechanism itself
//! (spec §9 Open Question).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults::{HTML_TAGS, MATHML_TAGS, SVG_TAGS};
use crate::dom::{
    append_child, detach, insert_before, parent_of, ElementData, Node, NodeData, NodeRef, QualName,
};

const TEMPLATE_PLACEHOLDER_ATTR: &str = "data-citadel-template-placeholder";

static CUSTOM_SELF_CLOSING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<([a-zA-Z][\w]*-[\w]+)((?:\s+[^<>]*)?)/>"#).unwrap());

static SELECT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<select\b[^>]*>.*?</select\s*>").unwrap());

static TEMPLATE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<template\b[^>]*>(.*?)</template\s*>").unwrap());

static LEADING_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t\n\r\x0c]+").unwrap());

// Foreign-content breakout rewrites (spec §4.2 step 3): each inserts the end
// tags a browser would emit when it breaks out of the foreign subtree, right
// before the tag that triggers the breakout.
static BREAKOUT_MATH_TITLE_STYLE_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(<math[^>]*>\s*<title[^>]*>\s*<style[^>]*>)(<img\b)").unwrap()
});
static BREAKOUT_SVG_STYLE_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(<svg[^>]*>\s*<style[^>]*>)(<img\b)").unwrap());
static BREAKOUT_SVG_P: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)(<svg[^>]*>(?:(?!</svg).)*?)(<p\b)").unwrap());
static BREAKOUT_SVG_BLOCKQUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(<svg[^>]*>(?:(?!</svg).)*?)(<blockquote\b)").unwrap());

fn is_default_builtin_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    HTML_TAGS.contains(lower.as_str()) || SVG_TAGS.contains(lower.as_str()) || MATHML_TAGS.contains(lower.as_str())
}

/// Custom elements (`foo-bar`) written with a self-closing slash must lose
/// it: browsers (and html5ever) ignore self-close on unrecognized elements,
/// so leaving it in place would make everything after the tag a child of it.
fn rewrite_custom_self_closing_tags(input: &str) -> String {
    CUSTOM_SELF_CLOSING_TAG
        .replace_all(input, |caps: &regex::Captures| {
            let tag = &caps[1];
            let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            if is_default_builtin_tag(tag) {
                caps[0].to_string()
            } else {
                format!("<{tag}{attrs}>")
            }
        })
        .into_owned()
}

/// Swap every `<template>` inside a `<select>` for a placeholder `<option>`
/// so the HTML parser doesn't silently drop it (spec §4.2 step 2). Returns
/// the rewritten markup plus the `(placeholder id, inner html)` pairs needed
/// to rewrap them after parsing.
fn rewrite_select_templates(input: &str) -> (String, Vec<(String, String)>) {
    let mut placeholders = Vec::new();
    let mut next_id = 0usize;

    let mut out = String::with_capacity(input.len());
    let mut last_end = 0;
    for block in SELECT_BLOCK.find_iter(input) {
        out.push_str(&input[last_end..block.start()]);
        let rewritten = TEMPLATE_BLOCK.replace_all(block.as_str(), |caps: &regex::Captures| {
            let id = format!("tpl-{next_id}");
            next_id += 1;
            placeholders.push((id.clone(), caps[1].to_string()));
            format!(r#"<option {TEMPLATE_PLACEHOLDER_ATTR}="{id}"></option>"#)
        });
        out.push_str(&rewritten);
        last_end = block.end();
    }
    out.push_str(&input[last_end..]);
    (out, placeholders)
}

fn breakout_foreign_content(input: &str) -> String {
    let mut s = BREAKOUT_MATH_TITLE_STYLE_IMG.replace_all(input, "$1</style></title></math>$2").into_owned();
    s = BREAKOUT_SVG_STYLE_IMG.replace_all(&s, "$1</style></svg>$2").into_owned();
    s = BREAKOUT_SVG_P.replace_all(&s, "$1</svg>$2").into_owned();
    s = BREAKOUT_SVG_BLOCKQUOTE.replace_all(&s, "$1</svg>$2").into_owned();
    s
}

pub struct PreprocessOutput {
    pub html: String,
    pub leading_whitespace: Option<String>,
    pub template_placeholders: Vec<(String, String)>,
    pub force_body: bool,
}

/// Run the full pre-processor pipeline (spec §4.2) over `input`, HTML mode
/// only — XHTML mode skips all of this (see `crate::xhtml`).
pub fn preprocess(input: &str, force_body: bool) -> PreprocessOutput {
    let mut html = rewrite_custom_self_closing_tags(input);
    let (rewritten, template_placeholders) = rewrite_select_templates(&html);
    html = rewritten;
    html = breakout_foreign_content(&html);

    let mut leading_whitespace = None;
    if force_body {
        html = format!("<remove></remove>{html}");
    } else if let Some(m) = LEADING_WHITESPACE.find(&html) {
        leading_whitespace = Some(m.as_str().to_string());
    }

    PreprocessOutput { html, leading_whitespace, template_placeholders, force_body }
}

/// Undo the string-level rewrites against the parsed tree: drop the
/// `<remove>` sentinel, reinsert captured leading whitespace, and rewrap
/// template placeholders back into real `<template>` elements.
pub fn postprocess(root: &NodeRef, output: &PreprocessOutput) {
    if output.force_body {
        remove_first_sentinel(root);
    } else if let Some(ws) = &output.leading_whitespace {
        if !ws.is_empty() {
            reinsert_leading_whitespace(root, ws);
        }
    }

    if !output.template_placeholders.is_empty() {
        let map: HashMap<&str, &str> =
            output.template_placeholders.iter().map(|(id, inner)| (id.as_str(), inner.as_str())).collect();
        rewrap_template_placeholders(root, &map);
    }
}

fn remove_first_sentinel(root: &NodeRef) {
    if let Some(sentinel) = find_first(root, |n| n.tag_name() == Some("remove")) {
        detach(&sentinel);
    }
}

fn reinsert_leading_whitespace(root: &NodeRef, ws: &str) {
    let Some(body) = find_first(root, |n| n.tag_name() == Some("body")).or_else(|| Some(root.clone())) else {
        return;
    };
    let text = Node::new(NodeData::Text(ws.to_string()));
    let first_child = body.borrow().children.first().cloned();
    match first_child {
        Some(first) => insert_before(&body, &first, text),
        None => append_child(&body, text),
    }
}

fn rewrap_template_placeholders(root: &NodeRef, placeholders: &HashMap<&str, &str>) {
    for option in find_all(root, |n| {
        n.as_element().map(|e| e.attr(TEMPLATE_PLACEHOLDER_ATTR).is_some()).unwrap_or(false)
    }) {
        let id = option.borrow().as_element().and_then(|e| e.attr(TEMPLATE_PLACEHOLDER_ATTR).map(|s| s.to_string()));
        let Some(id) = id else { continue };
        let Some(inner) = placeholders.get(id.as_str()) else { continue };

        let template =
            Node::new(NodeData::Element(ElementData { name: QualName::plain("template"), attrs: Vec::new() }));

        if let Ok(fragment) = crate::html::parse_html_fragment(inner) {
            let children: Vec<NodeRef> = fragment.borrow().children.clone();
            for child in children {
                detach(&child);
                append_child(&template, child);
            }
        }

        if let Some(parent) = parent_of(&option) {
            insert_before(&parent, &option, template);
            detach(&option);
        }
    }
}

fn find_first(root: &NodeRef, pred: impl Fn(&crate::dom::Node) -> bool) -> Option<NodeRef> {
    find_first_dyn(root, &pred)
}

fn find_first_dyn(root: &NodeRef, pred: &dyn Fn(&crate::dom::Node) -> bool) -> Option<NodeRef> {
    if pred(&root.borrow()) {
        return Some(root.clone());
    }
    for child in root.borrow().children.clone() {
        if let Some(found) = find_first_dyn(&child, pred) {
            return Some(found);
        }
    }
    None
}

fn find_all(root: &NodeRef, pred: impl Fn(&crate::dom::Node) -> bool + Copy) -> Vec<NodeRef> {
    let mut out = Vec::new();
    collect_all(root, pred, &mut out);
    out
}

fn collect_all(root: &NodeRef, pred: impl Fn(&crate::dom::Node) -> bool + Copy, out: &mut Vec<NodeRef>) {
    if pred(&root.borrow()) {
        out.push(root.clone());
    }
    for child in root.borrow().children.clone() {
        collect_all(&child, pred, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_self_closing_tag_loses_its_slash() {
        let out = rewrite_custom_self_closing_tags(r#"<my-widget foo="bar"/>"#);
        assert_eq!(out, r#"<my-widget foo="bar">"#);
    }

    #[test]
    fn builtin_tag_with_self_close_is_untouched() {
        let out = rewrite_custom_self_closing_tags(r#"<path-data/>"#);
        // "path-data" is not a builtin tag name, so it IS rewritten.
        assert_eq!(out, "<path-data>");
        let svg_untouched = rewrite_custom_self_closing_tags("<br/>");
        assert_eq!(svg_untouched, "<br/>");
    }

    #[test]
    fn select_template_is_swapped_for_placeholder_option() {
        let (rewritten, placeholders) =
            rewrite_select_templates("<select><template>inner</template></select>");
        assert!(rewritten.contains(TEMPLATE_PLACEHOLDER_ATTR));
        assert_eq!(placeholders, vec![("tpl-0".to_string(), "inner".to_string())]);
    }

    #[test]
    fn math_title_style_img_breakout_is_closed_before_img() {
        let out =
            breakout_foreign_content("<math><title><style><img src=x onerror=alert(1)></math>");
        assert!(out.contains("</style></title></math><img"));
    }

    #[test]
    fn force_body_prepends_remove_sentinel() {
        let out = preprocess("<p>hi</p>", true);
        assert!(out.html.starts_with("<remove></remove>"));
    }

    #[test]
    fn leading_whitespace_is_captured_without_force_body() {
        let out = preprocess("   <p>hi</p>", false);
        assert_eq!(out.leading_whitespace.as_deref(), Some("   "));
    }
}

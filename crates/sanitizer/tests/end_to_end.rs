//! End-to-end scenarios against the public API, exercised through the
//! scenario tables the unit-level tests don't already cover.

use citadel_sanitizer::{self as sanitizer, Config, HookPhase, Sanitizer};
use pretty_assertions::assert_eq;

#[test]
fn image_with_event_handler_is_cleaned() {
    let out = sanitizer::sanitize("<img src=x onerror=alert(1)>", None);
    assert_eq!(out, r#"<img src="x">"#);
}

#[test]
fn javascript_anchor_href_is_dropped() {
    let out = sanitizer::sanitize(r#"<a href="javascript:alert(1)">x</a>"#, None);
    assert_eq!(out, "<a>x</a>");
}

#[test]
fn script_tag_and_its_content_are_removed() {
    let out = sanitizer::sanitize("<script>alert(1)</script>hello", None);
    assert_eq!(out, "hello");
}

#[test]
fn unrecognized_tag_is_unwrapped_not_dropped() {
    let out = sanitizer::sanitize("<foobar>abc</foobar>", None);
    assert_eq!(out, "abc");
}

#[test]
fn template_expression_is_blanked_under_safe_for_templates() {
    let cfg = Config::builder().safe_for_templates(true).build();
    let out = sanitizer::sanitize("<div>{{v}}</div>", Some(&cfg));
    assert_eq!(out, "<div> </div>");
}

#[test]
fn hook_can_force_keep_a_normally_stripped_attribute() {
    let mut sanitizer = Sanitizer::builder();
    let cfg = Config::builder().allowed_tags(["a"]).build();
    sanitizer.add_hook(HookPhase::UponSanitizeAttribute, |_node, event| {
        let Some(event) = event else { return };
        if event.attr_name.as_deref() == Some("onclick") {
            event.force_keep_attr = Some(true);
        }
    });
    let out = sanitizer.sanitize(r#"<a onclick="alert(1)">x</a>"#, Some(&cfg));
    assert!(out.contains(r#"onclick="alert(1)""#));
}

#[test]
fn shadow_root_template_keeps_added_attribute_and_fires_shadow_hooks() {
    let mut sanitizer = Sanitizer::builder();
    let cfg = Config::builder().allowed_tags(["template", "div"]).allowed_attributes(["shadowroot"]).build();
    sanitizer.add_hook(HookPhase::UponSanitizeShadowNode, |node, _event| {
        if node.borrow().tag_name() == Some("div") {
            if let Some(el) = node.borrow_mut().as_element_mut() {
                el.set_attr("data-hook-injected", "1");
            }
        }
    });
    let out = sanitizer.sanitize(r#"<template shadowroot="open"><div></div></template>"#, Some(&cfg));
    assert!(out.contains(r#"shadowroot="open""#));
}

#[test]
fn removed_log_counts_dropped_script_once() {
    let outcome =
        sanitizer::sanitize_and_get_removed("<script>alert(1)</script><div>x</div>", None);
    assert_eq!(outcome.removed.len(), 1);
}

#[test]
fn removed_log_counts_dropped_javascript_href_once() {
    let outcome = sanitizer::sanitize_and_get_removed(r#"<a href="javascript:alert(1)">x</a>"#, None);
    assert_eq!(outcome.removed.len(), 1);
}

#[test]
fn removed_log_counts_dropped_comment_once() {
    let outcome = sanitizer::sanitize_and_get_removed("<!--boom-->", None);
    assert_eq!(outcome.removed.len(), 1);
}

#[test]
fn empty_input_yields_empty_output() {
    assert_eq!(sanitizer::sanitize("", None), "");
}

#[test]
fn idempotent_under_default_config() {
    let input = r#"<div><a href="javascript:alert(1)" onclick="bad()">x</a><img src=y onerror=z></div>"#;
    let once = sanitizer::sanitize(input, None);
    let twice = sanitizer::sanitize(&once, None);
    assert_eq!(once, twice);
}

#[test]
fn force_body_never_leaks_the_internal_sentinel() {
    let cfg = Config::builder().force_body(true).build();
    let out = sanitizer::sanitize("<p>hi</p>", Some(&cfg));
    assert!(!out.contains("<remove>"));
}

#[test]
fn leading_whitespace_is_preserved_without_force_body() {
    let out = sanitizer::sanitize("   <p>hi</p>", None);
    assert!(out.starts_with("   "));
}

#[test]
fn sanitize_to_fragment_reports_first_child_text_value() {
    let sanitizer = Sanitizer::builder();
    let fragment = sanitizer.sanitize_to_fragment("plain text<div>x</div>", None);
    assert_eq!(fragment.first_child_node_value.as_deref(), Some("plain text"));
}

#[test]
fn sanitize_to_document_exposes_head_and_body_html() {
    let sanitizer = Sanitizer::builder();
    let cfg = Config::builder().whole_document(true).build();
    let doc = sanitizer.sanitize_to_document("<title>t</title><p>hi</p>", Some(&cfg));
    assert_eq!(doc.head_html.unwrap_or_default(), "<title>t</title>");
    assert_eq!(doc.body_html.unwrap_or_default(), "<p>hi</p>");
}

#[test]
fn sanitize_in_place_mutates_the_given_root_subtree() {
    use citadel_sanitizer::dom::{append_child, ElementData, Node, NodeData, QualName};

    let div = Node::new(NodeData::Element(ElementData { name: QualName::plain("div"), attrs: vec![] }));
    let script = Node::new(NodeData::Element(ElementData { name: QualName::plain("script"), attrs: vec![] }));
    append_child(&div, script);

    Sanitizer::global().sanitize_in_place(&div, None).unwrap();
    assert!(div.borrow().children.is_empty());
}

#[test]
fn sanitize_in_place_rejects_a_forbidden_root_without_mutating() {
    use citadel_sanitizer::dom::{append_child, ElementData, Node, NodeData, QualName};

    let script = Node::new(NodeData::Element(ElementData { name: QualName::plain("script"), attrs: vec![] }));
    let text = Node::new(NodeData::Text("alert(1)".into()));
    append_child(&script, text);

    let err = Sanitizer::global().sanitize_in_place(&script, None).unwrap_err();
    assert!(matches!(err, citadel_sanitizer::SanitizeError::ForbiddenRootNode { .. }));
    assert_eq!(script.borrow().children.len(), 1);
}

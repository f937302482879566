//! The traversal and decision core (spec §4.4): a single-threaded,
//! depth-first "next-node" walk that decides, per element, whether to keep,
//! remove, or unwrap it, and dispatches to the attribute filter for every
//! kept element.

use std::collections::HashMap;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::attrs::{filter_attributes, is_custom_element};
use crate::config::{MediaType, ResolvedConfig};
use crate::dom::{detach, parent_of, unwrap_node, NodeData, NodeId, NodeRef};
use crate::hooks::{AllowSetProxy, HookEvent, HookPhase, HookRegistry};
use crate::namespace::{next_namespace_html, transition_is_valid, Namespace, NamespaceMap, XhtmlNsContext};
use crate::removed::RemovedLog;

static MXSS_LEAF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[/\w!]").unwrap());
static NESTED_NO_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</no(script|embed|frames)").unwrap());

#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Keep,
    Remove,
    Unwrap,
}

fn mxss_leaf_check(node: &NodeRef, cfg: &ResolvedConfig) -> bool {
    if !cfg.safe_for_xml {
        return false;
    }
    let has_children = !node.borrow().children.is_empty();
    let has_element_child = node.borrow().children.iter().any(|c| c.borrow().is_element());
    if !has_children || has_element_child {
        return false;
    }
    let text = node.borrow().text_content();
    let inner = crate::serialize::serialize_inner_html(node);
    MXSS_LEAF.is_match(&text) && MXSS_LEAF.is_match(&inner)
}

fn decide_element(node: &NodeRef, tag_lower: &str, ns: &Namespace, parent_ns: &Namespace, cfg: &ResolvedConfig) -> Decision {
    if mxss_leaf_check(node, cfg) {
        return Decision::Remove;
    }

    if cfg.forbid_tags.contains(tag_lower) || !cfg.allowed_tags.contains(tag_lower) {
        let forbidden = cfg.forbid_tags.contains(tag_lower);
        if !forbidden && is_custom_element(tag_lower) && cfg.matches_custom_tag_check(tag_lower) {
            return Decision::Keep;
        }
        return if cfg.keep_content && !cfg.forbid_contents.contains(tag_lower) {
            Decision::Unwrap
        } else {
            Decision::Remove
        };
    }

    if cfg.safe_for_xml && matches!(tag_lower, "noscript" | "noembed" | "noframes") {
        let inner = crate::serialize::serialize_inner_html(node);
        if NESTED_NO_CLOSE.is_match(&inner) {
            return Decision::Remove;
        }
    }

    if !cfg.allowed_namespace_uris.contains(ns.uri()) || !transition_is_valid(parent_ns, ns, tag_lower) {
        return Decision::Remove;
    }

    Decision::Keep
}

fn is_shadow_host(node: &NodeRef) -> bool {
    node.borrow()
        .as_element()
        .map(|e| e.tag() == "template" && (e.has_attr("shadowroot") || e.has_attr("shadowrootmode")))
        .unwrap_or(false)
}

fn is_in_shadow_subtree(node: &NodeRef) -> bool {
    let mut current = parent_of(node);
    while let Some(p) = current {
        if is_shadow_host(&p) {
            return true;
        }
        current = parent_of(&p);
    }
    false
}

/// Find the node to resume traversal at once `node`'s entire subtree (kept
/// or not) has been dealt with: its next sibling, or the next sibling of
/// the nearest ancestor that has one. Must be computed before `node` is
/// detached, since detaching severs the parent pointer this needs.
fn next_after_subtree(node: &NodeRef, root: &NodeRef) -> Option<NodeRef> {
    let mut current = node.clone();
    loop {
        if Rc::ptr_eq(&current, root) {
            return None;
        }
        let parent = parent_of(&current)?;
        let idx = parent.borrow().children.iter().position(|c| Rc::ptr_eq(c, &current))?;
        if let Some(next) = parent.borrow().children.get(idx + 1) {
            return Some(next.clone());
        }
        current = parent;
    }
}

struct NsTracker {
    map: NamespaceMap,
    xhtml_contexts: HashMap<NodeId, XhtmlNsContext>,
}

impl NsTracker {
    fn new(root: &NodeRef, cfg: &ResolvedConfig) -> Self {
        let mut map = NamespaceMap::new();
        let mut xhtml_contexts = HashMap::new();
        if cfg.parser_media_type == MediaType::Xhtml {
            let root_ctx = XhtmlNsContext::root(cfg.namespace_uri.clone());
            map.set(root.borrow().id, Namespace::from_uri(&root_ctx.default_ns));
            xhtml_contexts.insert(root.borrow().id, root_ctx);
        } else {
            map.set(root.borrow().id, Namespace::Html);
        }
        Self { map, xhtml_contexts }
    }

    fn assign(&mut self, node: &NodeRef, parent: &NodeRef, cfg: &ResolvedConfig) -> Namespace {
        let ns = if cfg.parser_media_type == MediaType::Xhtml {
            let parent_id = parent.borrow().id;
            let parent_ctx = self
                .xhtml_contexts
                .get(&parent_id)
                .cloned()
                .unwrap_or_else(|| XhtmlNsContext::root(cfg.namespace_uri.clone()));
            let attr_pairs: Vec<(String, String)> = node
                .borrow()
                .as_element()
                .map(|e| e.attrs.iter().map(|a| (a.name.to_string(), a.value.clone())).collect())
                .unwrap_or_default();
            let next_ctx = parent_ctx.with_declarations(attr_pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())));
            let prefix = node.borrow().as_element().and_then(|e| e.name.prefix.clone());
            let uri = next_ctx.resolve(prefix.as_deref());
            self.xhtml_contexts.insert(node.borrow().id, next_ctx);
            Namespace::from_uri(&uri)
        } else {
            let parent_ns = self.map.get(parent.borrow().id).cloned().unwrap_or(Namespace::Html);
            let parent_tag = parent.borrow().tag_name().map(|s| s.to_string());
            let tag_lower = node.borrow().tag_name().map(|s| s.to_ascii_lowercase()).unwrap_or_default();
            next_namespace_html(&parent_ns, parent_tag.as_deref(), &tag_lower)
        };
        self.map.set(node.borrow().id, ns.clone());
        tracing::trace!(?ns, "namespace transition");
        ns
    }

    fn get(&self, node: &NodeRef) -> Namespace {
        self.map.get(node.borrow().id).cloned().unwrap_or(Namespace::Html)
    }
}

/// Walk and sanitize `root`'s subtree in place (spec §4.4). `root` itself
/// is never removed or unwrapped by this function — callers that need the
/// "forbidden root" check (in-place sanitization) run `decide_root` first.
pub fn sanitize_tree(root: &NodeRef, cfg: &mut ResolvedConfig, hooks: &HookRegistry, removed: &mut RemovedLog) {
    let is_xhtml = cfg.parser_media_type == MediaType::Xhtml;
    let mut ns = NsTracker::new(root, cfg);

    let mut current = root.borrow().children.first().cloned();
    while let Some(node) = current {
        if is_in_shadow_subtree(&node) {
            hooks.fire(HookPhase::UponSanitizeShadowNode, &node, None);
        }
        hooks.fire(HookPhase::BeforeSanitizeElements, &node, None);

        let is_element = node.borrow().is_element();
        let is_text = matches!(node.borrow().data, NodeData::Text(_) | NodeData::RawData(_));
        let is_inert = matches!(node.borrow().data, NodeData::Comment(_) | NodeData::ProcessingInstruction { .. });

        current = if is_element {
            visit_element(&node, root, cfg, hooks, removed, &mut ns, is_xhtml)
        } else if is_text {
            visit_text(&node, root, cfg, hooks)
        } else if is_inert {
            let next = next_after_subtree(&node, root);
            detach(&node);
            next
        } else {
            // Document/Doctype nodes that show up mid-tree (shouldn't, but
            // the walk must still make progress).
            descend_or_skip(&node, root)
        };
    }
}

fn descend_or_skip(node: &NodeRef, root: &NodeRef) -> Option<NodeRef> {
    node.borrow().children.first().cloned().or_else(|| next_after_subtree(node, root))
}

fn visit_element(
    node: &NodeRef,
    root: &NodeRef,
    cfg: &mut ResolvedConfig,
    hooks: &HookRegistry,
    removed: &mut RemovedLog,
    ns: &mut NsTracker,
    is_xhtml: bool,
) -> Option<NodeRef> {
    if !is_xhtml {
        if let Some(el) = node.borrow_mut().as_element_mut() {
            el.name.local = el.name.local.to_ascii_lowercase();
        }
    }

    let parent = parent_of(node)?;
    let element_ns = ns.assign(node, &parent, cfg);
    let parent_ns = ns.get(&parent);

    let tag_lower = node.borrow().tag_name().map(|s| s.to_string()).unwrap_or_default();

    if !hooks.is_empty(HookPhase::UponSanitizeElement) {
        let mut event = HookEvent::for_element(tag_lower.clone());
        event.allowed_tags_proxy = Some(AllowSetProxy::new(&mut cfg.allowed_tags));
        event.allowed_attributes_proxy = Some(AllowSetProxy::new(&mut cfg.allowed_attributes));
        hooks.fire(HookPhase::UponSanitizeElement, node, Some(&mut event));
    }

    let shadow_host = is_shadow_host(node);
    if shadow_host {
        hooks.fire(HookPhase::BeforeSanitizeShadowDom, node, None);
    }

    let decision = decide_element(node, &tag_lower, &element_ns, &parent_ns, cfg);
    tracing::debug!(tag = %tag_lower, ?decision, "element decision");

    match decision {
        Decision::Keep => {
            hooks.fire(HookPhase::BeforeSanitizeAttributes, node, None);
            filter_attributes(node, cfg, hooks, removed);
            hooks.fire(HookPhase::AfterSanitizeAttributes, node, None);
            hooks.fire(HookPhase::AfterSanitizeElements, node, None);
            if shadow_host {
                hooks.fire(HookPhase::AfterSanitizeShadowDom, node, None);
            }
            descend_or_skip(node, root)
        }
        Decision::Remove => {
            let next = next_after_subtree(node, root);
            removed.push_element(tag_lower);
            detach(node);
            next
        }
        Decision::Unwrap => {
            let fallback_next = next_after_subtree(node, root);
            let first_child = unwrap_node(node);
            first_child.or(fallback_next)
        }
    }
}

static TEMPLATE_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]*\}\}|<%[^%]*%>|\$\{[^}]*\}").unwrap());

fn visit_text(node: &NodeRef, root: &NodeRef, cfg: &ResolvedConfig, hooks: &HookRegistry) -> Option<NodeRef> {
    if cfg.safe_for_templates {
        let stripped = {
            let n = node.borrow();
            match &n.data {
                NodeData::Text(t) | NodeData::RawData(t) => Some(TEMPLATE_EXPR.replace_all(t, " ").into_owned()),
                _ => None,
            }
        };
        if let Some(stripped) = stripped {
            if let NodeData::Text(t) | NodeData::RawData(t) = &mut node.borrow_mut().data {
                *t = stripped;
            }
        }
    }

    if cfg.safe_for_xml {
        let content_triggers_removal = {
            let n = node.borrow();
            match &n.data {
                NodeData::Text(t) | NodeData::RawData(t) => MXSS_LEAF.is_match(t) || t.as_str() == "\">",
                _ => false,
            }
        };
        if content_triggers_removal {
            let next = next_after_subtree(node, root);
            detach(node);
            hooks.fire(HookPhase::AfterSanitizeElements, node, None);
            return next;
        }
    }

    hooks.fire(HookPhase::AfterSanitizeElements, node, None);
    descend_or_skip(node, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, Config};
    use crate::dom::{append_child, Attr, ElementData, Node, QualName};
    use crate::hooks::HookRegistry;

    fn body_with(children: Vec<NodeRef>) -> NodeRef {
        let body = Node::new(NodeData::Element(ElementData { name: QualName::plain("body"), attrs: vec![] }));
        for c in children {
            append_child(&body, c);
        }
        body
    }

    #[test]
    fn script_element_is_removed_entirely() {
        let script = Node::new(NodeData::Element(ElementData { name: QualName::plain("script"), attrs: vec![] }));
        append_child(&script, Node::new(NodeData::Text("alert(1)".into())));
        let body = body_with(vec![script]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        sanitize_tree(&body, &mut cfg, &hooks, &mut removed);
        assert!(body.borrow().children.is_empty());
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn unknown_tag_is_unwrapped_and_content_kept() {
        let foobar = Node::new(NodeData::Element(ElementData { name: QualName::plain("foobar"), attrs: vec![] }));
        append_child(&foobar, Node::new(NodeData::Text("abc".into())));
        let body = body_with(vec![foobar]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        sanitize_tree(&body, &mut cfg, &hooks, &mut removed);
        assert_eq!(body.borrow().children.len(), 1);
        assert!(matches!(&body.borrow().children[0].borrow().data, NodeData::Text(t) if t == "abc"));
    }

    #[test]
    fn javascript_href_attribute_is_dropped() {
        let a = Node::new(NodeData::Element(ElementData {
            name: QualName::plain("a"),
            attrs: vec![Attr::new(QualName::plain("href"), "javascript:alert(1)")],
        }));
        append_child(&a, Node::new(NodeData::Text("x".into())));
        let body = body_with(vec![a.clone()]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        sanitize_tree(&body, &mut cfg, &hooks, &mut removed);
        assert!(a.borrow().as_element().unwrap().attrs.is_empty());
    }

    #[test]
    fn html_inside_svg_outside_integration_point_is_removed() {
        let div = Node::new(NodeData::Element(ElementData { name: QualName::plain("div"), attrs: vec![] }));
        let svg = Node::new(NodeData::Element(ElementData { name: QualName::plain("svg"), attrs: vec![] }));
        append_child(&svg, div);
        let body = body_with(vec![svg.clone()]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        sanitize_tree(&body, &mut cfg, &hooks, &mut removed);
        assert!(svg.borrow().children.is_empty());
    }

    #[test]
    fn hook_can_widen_allowed_tags_via_proxy_for_the_rest_of_the_call() {
        let foobar = Node::new(NodeData::Element(ElementData { name: QualName::plain("foobar"), attrs: vec![] }));
        append_child(&foobar, Node::new(NodeData::Text("x".into())));
        let body = body_with(vec![foobar]);
        let mut cfg = resolve(&Config::builder().allowed_tags(["body"]).build());
        let mut hooks = HookRegistry::new();
        hooks.add(HookPhase::UponSanitizeElement, |_node, event| {
            let Some(event) = event else { return };
            if event.tag_name.as_deref() == Some("foobar") {
                if let Some(proxy) = event.allowed_tags_proxy.as_mut() {
                    proxy.set("foobar", true);
                }
            }
        });
        let mut removed = RemovedLog::new();
        sanitize_tree(&body, &mut cfg, &hooks, &mut removed);
        assert_eq!(body.borrow().children[0].borrow().tag_name(), Some("foobar"));
        assert!(removed.is_empty());
    }
}

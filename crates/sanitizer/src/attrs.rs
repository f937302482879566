//! The attribute filter (spec §4.5): per-attribute keep/drop decision, URI
//! scheme validation, template-expression stripping, ARIA/data-attribute
//! allowlisting, custom-element rules, and DOM-clobber protection.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{MediaType, ResolvedConfig};
use crate::defaults::CLOBBER_PRONE_PROPERTIES;
use crate::dom::{Attr, NodeRef, QualName};
use crate::hooks::{AllowSetProxy, HookEvent, HookPhase, HookRegistry};
use crate::removed::RemovedLog;

static CUSTOM_ELEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][.\w]*(-[.\w]+)+$").unwrap());
static DATA_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^data-[\w.-]+$").unwrap());
static ARIA_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^aria-[\w-]+$").unwrap());
static TEMPLATE_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]*\}\}|<%[^%]*%>|\$\{[^}]*\}").unwrap());
static SAFE_FOR_XML_BAD_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)((--!?|])>)|</(style|title|textarea)").unwrap());
static SCRIPT_OR_DATA_PROTOCOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:\w+script|data):").unwrap());
/// DOMPurify's default allowed-URI regex (spec §4.5 "Default path").
static DEFAULT_ALLOWED_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:(?:f|ht)tps?|mailto|tel|callto|sms|cid|xmpp|matrix):|[^a-z]|[a-z+.\-]+(?:[^a-z+.\-:]|$))")
        .unwrap()
});

fn is_whitespace_byte(c: char) -> bool {
    matches!(c as u32, 0x00..=0x20 | 0xA0 | 0x1680 | 0x180E | 0x2000..=0x2029 | 0x205F | 0x3000)
}

fn trim_whitespace(value: &str) -> String {
    value.trim_matches(is_whitespace_byte).to_string()
}

fn strip_template_expressions(value: &str) -> String {
    TEMPLATE_EXPR.replace_all(value, " ").into_owned()
}

pub(crate) fn is_custom_element(tag_lower: &str) -> bool {
    CUSTOM_ELEMENT.is_match(tag_lower) && tag_lower != "annotation-xml"
}

/// The validity check chain (spec §4.5 "Validity check"), run after every
/// other per-attribute rule has had a chance to drop the attribute outright.
fn is_valid_attribute(tag_lower: &str, name: &str, value: &str, cfg: &ResolvedConfig) -> bool {
    if cfg.sanitize_dom && (name == "id" || name == "name") && CLOBBER_PRONE_PROPERTIES.contains(value) {
        return false;
    }

    if cfg.allow_data_attributes
        && !cfg.safe_for_templates
        && !cfg.forbid_attributes.contains(name)
        && DATA_ATTR.is_match(name)
    {
        return true;
    }

    if cfg.allow_aria_attributes && ARIA_ATTR.is_match(name) {
        return true;
    }

    if !cfg.allowed_attributes.contains(name) || cfg.forbid_attributes.contains(name) {
        let custom_tag_attr_ok = is_custom_element(tag_lower) && cfg.matches_custom_attribute_check(name);
        let customized_builtin_ok = name == "is"
            && cfg.allow_customized_built_in_elements
            && cfg.matches_custom_tag_check(value);
        if !(custom_tag_attr_ok || customized_builtin_ok) {
            return false;
        }
    }

    if cfg.uri_safe_attributes.contains(name) {
        return true;
    }

    if value.is_empty() {
        return true;
    }

    let trimmed = trim_whitespace(value);

    if matches!(name, "src" | "xlink:href" | "href")
        && tag_lower != "script"
        && trimmed.starts_with("data:")
        && cfg.data_uri_tags.contains(tag_lower)
    {
        return true;
    }

    if let Some(matched) = cfg.uri_is_allowed_by_user_regexp(&trimmed) {
        return matched;
    }

    if DEFAULT_ALLOWED_URI.is_match(&trimmed) {
        return true;
    }

    cfg.allow_unknown_protocols && !SCRIPT_OR_DATA_PROTOCOL.is_match(&trimmed)
}

/// Run the attribute filter over `element`'s attributes in place (spec
/// §4.5). The element must already have been decided `keep` by the
/// traversal core.
pub fn filter_attributes(element: &NodeRef, cfg: &mut ResolvedConfig, hooks: &HookRegistry, removed: &mut RemovedLog) {
    let is_xhtml = cfg.parser_media_type == MediaType::Xhtml;
    let (tag_lower, original_attrs) = {
        let node = element.borrow();
        match node.as_element() {
            Some(el) => (el.tag().to_ascii_lowercase(), el.attrs.clone()),
            None => return,
        }
    };

    let mut had_is_attr = false;
    let mut kept: Vec<Attr> = Vec::with_capacity(original_attrs.len());

    for attr in original_attrs {
        let name_original = attr.name.local.clone();
        if name_original.eq_ignore_ascii_case("is") {
            had_is_attr = true;
        }
        let name_lower = if is_xhtml { name_original.clone() } else { name_original.to_ascii_lowercase() };
        let value_for_check =
            if name_lower == "value" { attr.value.clone() } else { trim_whitespace(&attr.value) };

        let mut attr_name = name_lower;
        let mut attr_value = value_for_check;
        let mut keep_attr = true;
        let mut force_keep_attr = None;

        if !hooks.is_empty(HookPhase::UponSanitizeAttribute) {
            let mut event = HookEvent::for_attribute(attr_name.clone(), attr_value.clone());
            event.allowed_attributes_proxy = Some(AllowSetProxy::new(&mut cfg.allowed_attributes));
            hooks.fire(HookPhase::UponSanitizeAttribute, element, Some(&mut event));
            if let Some(v) = event.attr_value {
                attr_value = v;
            }
            if let Some(n) = event.attr_name {
                attr_name = n;
            }
            keep_attr = event.keep_attr;
            force_keep_attr = event.force_keep_attr;
        }

        if force_keep_attr == Some(true) {
            kept.push(Attr::new(QualName::new(attr.name.prefix, attr.name.ns, attr_name), attr_value));
            continue;
        }
        if !keep_attr {
            removed.push_attribute(attr_name, tag_lower.clone());
            continue;
        }

        if cfg.sanitize_named_props && (attr_name == "id" || attr_name == "name") {
            attr_value = format!("user-content-{attr_value}");
        }

        if attr_name == "attributename" && attr_value.to_ascii_lowercase().contains("href") {
            removed.push_attribute(attr_name, tag_lower.clone());
            continue;
        }

        if !cfg.allow_self_close_in_attributes && attr_value.contains("/>") {
            removed.push_attribute(attr_name, tag_lower.clone());
            continue;
        }

        if cfg.safe_for_xml && SAFE_FOR_XML_BAD_VALUE.is_match(&attr_value) {
            removed.push_attribute(attr_name, tag_lower.clone());
            continue;
        }

        if cfg.safe_for_templates {
            attr_value = strip_template_expressions(&attr_value);
        }

        if !is_valid_attribute(&tag_lower, &attr_name, &attr_value, cfg) {
            removed.push_attribute(attr_name, tag_lower.clone());
            continue;
        }

        kept.push(Attr::new(QualName::new(attr.name.prefix, attr.name.ns, attr_name), attr_value));
    }

    if had_is_attr && !kept.iter().any(|a| a.name.local.eq_ignore_ascii_case("is")) {
        kept.push(Attr::new(QualName::plain("is"), ""));
    }

    if let Some(el) = element.borrow_mut().as_element_mut() {
        el.attrs = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, Config};
    use crate::dom::{ElementData, Node, NodeData};

    fn elem(tag: &str, attrs: Vec<(&str, &str)>) -> NodeRef {
        let attrs = attrs.into_iter().map(|(n, v)| Attr::new(QualName::plain(n), v)).collect();
        Node::new(NodeData::Element(ElementData { name: QualName::plain(tag), attrs }))
    }

    fn names(node: &NodeRef) -> Vec<String> {
        node.borrow().as_element().unwrap().attrs.iter().map(|a| a.name.local.clone()).collect()
    }

    #[test]
    fn drops_event_handler_attribute() {
        let node = elem("img", vec![("src", "x"), ("onerror", "alert(1)")]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        assert_eq!(names(&node), vec!["src".to_string()]);
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn drops_javascript_uri_href() {
        let node = elem("a", vec![("href", "javascript:alert(1)")]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        assert!(names(&node).is_empty());
    }

    #[test]
    fn keeps_data_uri_image_src() {
        let node = elem("img", vec![("src", "data:image/png;base64,abc")]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        assert_eq!(names(&node), vec!["src".to_string()]);
    }

    #[test]
    fn clobber_prone_id_value_is_rejected() {
        let node = elem("div", vec![("id", "body")]);
        let mut cfg = resolve(&Config::default());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        assert!(names(&node).is_empty());
    }

    #[test]
    fn safe_for_templates_strips_mustache_in_values() {
        let node = elem("div", vec![("title", "hello {{name}}")]);
        let mut cfg = resolve(&Config::builder().safe_for_templates(true).build());
        let hooks = HookRegistry::new();
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        let value = node.borrow().as_element().unwrap().attr("title").unwrap().to_string();
        assert_eq!(value, "hello  ");
    }

    #[test]
    fn hook_can_widen_allowed_attributes_via_proxy_for_the_rest_of_the_call() {
        let node = elem("a", vec![("x-custom", "1")]);
        let mut cfg = resolve(&Config::builder().allowed_attributes(["href"]).build());
        let mut hooks = HookRegistry::new();
        hooks.add(HookPhase::UponSanitizeAttribute, |_node, event| {
            let Some(event) = event else { return };
            if event.attr_name.as_deref() == Some("x-custom") {
                if let Some(proxy) = event.allowed_attributes_proxy.as_mut() {
                    proxy.set("x-custom", true);
                }
            }
        });
        let mut removed = RemovedLog::new();
        filter_attributes(&node, &mut cfg, &hooks, &mut removed);
        assert_eq!(names(&node), vec!["x-custom".to_string()]);
        assert!(cfg.allowed_attributes.contains("x-custom"));
    }
}

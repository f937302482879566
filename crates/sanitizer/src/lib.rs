//! A security-focused HTML/SVG/MathML sanitization engine.
//!
//! Parses markup with `html5ever`/`xml5ever`, walks the resulting tree with
//! [`traverse::sanitize_tree`], and serializes the result back to a string
//! (or hands back the live tree). See each module for the stage of the
//! pipeline it implements.

pub mod attrs;
pub mod config;
pub mod defaults;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod html;
pub mod namespace;
pub mod preprocess;
pub mod removed;
pub mod serialize;
pub mod traverse;
pub mod xhtml;

use std::cell::RefCell;

use once_cell::sync::Lazy;
use parking_lot::ReentrantMutex;

pub use config::{Config, ConfigBuilder, MediaType, Profile};
pub use dom::NodeRef;
pub use error::{SanitizeError, SanitizeResult};
pub use hooks::{AllowSetProxy, HookEvent, HookHandle, HookPhase};
pub use removed::Removed;

use config::{resolve, ResolvedConfig};
use hooks::HookRegistry;
use removed::RemovedLog;

/// `sanitizeToFragment`'s return shape (spec §6).
pub struct FragmentOutput {
    pub html: String,
    pub first_child_node_value: Option<String>,
}

/// `sanitizeToDocument`'s return shape (spec §6).
pub struct DocumentOutput {
    pub html: String,
    pub head_html: Option<String>,
    pub body_html: Option<String>,
}

/// `sanitizeAndGetRemoved`'s return shape (spec §6).
pub struct SanitizeOutcome {
    pub sanitized: String,
    pub removed: Vec<Removed>,
}

struct GlobalState {
    persistent_config: Option<Config>,
    hooks: HookRegistry,
    last_removed: Vec<Removed>,
}

impl GlobalState {
    fn new() -> Self {
        Self { persistent_config: None, hooks: HookRegistry::new(), last_removed: Vec::new() }
    }
}

static GLOBAL: Lazy<ReentrantMutex<RefCell<GlobalState>>> =
    Lazy::new(|| ReentrantMutex::new(RefCell::new(GlobalState::new())));

/// A sanitizer instance. `Sanitizer::global()` operates against the
/// process-wide persistent configuration and hook registry (spec §5, §6);
/// `Sanitizer::builder()` returns a thread-confined instance with its own
/// configuration and hooks, for callers who don't want the shared state.
pub enum Sanitizer {
    Global,
    Scoped { config: Config, hooks: HookRegistry },
}

impl Sanitizer {
    pub fn global() -> Self {
        Sanitizer::Global
    }

    pub fn builder() -> Self {
        Sanitizer::Scoped { config: Config::default(), hooks: HookRegistry::new() }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        if let Sanitizer::Scoped { config: c, .. } = &mut self {
            *c = config;
        }
        self
    }

    pub fn add_hook<F>(&mut self, phase: HookPhase, f: F) -> HookHandle
    where
        F: for<'a> Fn(&NodeRef, Option<&mut hooks::HookEvent<'a>>) + Send + Sync + 'static,
    {
        match self {
            Sanitizer::Global => {
                let lock = GLOBAL.lock();
                let handle = lock.borrow_mut().hooks.add(phase, f);
                handle
            }
            Sanitizer::Scoped { hooks, .. } => hooks.add(phase, f),
        }
    }

    pub fn remove_hook(&mut self, phase: HookPhase, handle: &HookHandle) -> Option<HookHandle> {
        match self {
            Sanitizer::Global => GLOBAL.lock().borrow_mut().hooks.remove(phase, handle),
            Sanitizer::Scoped { hooks, .. } => hooks.remove(phase, handle),
        }
    }

    pub fn remove_hooks(&mut self, phase: HookPhase) {
        match self {
            Sanitizer::Global => GLOBAL.lock().borrow_mut().hooks.clear_phase(phase),
            Sanitizer::Scoped { hooks, .. } => hooks.clear_phase(phase),
        }
    }

    pub fn remove_all_hooks(&mut self) {
        match self {
            Sanitizer::Global => GLOBAL.lock().borrow_mut().hooks.clear_all(),
            Sanitizer::Scoped { hooks, .. } => hooks.clear_all(),
        }
    }

    fn effective_config(&self, override_config: Option<&Config>) -> Config {
        if let Some(c) = override_config {
            return c.clone();
        }
        match self {
            Sanitizer::Global => GLOBAL.lock().borrow().persistent_config.clone().unwrap_or_default(),
            Sanitizer::Scoped { config, .. } => config.clone(),
        }
    }

    fn record_removed(&self, removed: Vec<Removed>) {
        if let Sanitizer::Global = self {
            GLOBAL.lock().borrow_mut().last_removed = removed;
        }
    }

    fn fire_hooks<R>(&self, f: impl FnOnce(&HookRegistry) -> R) -> R {
        match self {
            Sanitizer::Global => f(&GLOBAL.lock().borrow().hooks),
            Sanitizer::Scoped { hooks, .. } => f(hooks),
        }
    }

    /// Parse `input`, sanitize it, and return the serialized body fragment
    /// (spec §6 `sanitize`).
    pub fn sanitize(&self, input: &str, config: Option<&Config>) -> String {
        self.run(input, config).map(|(s, _)| s).unwrap_or_default()
    }

    /// Sanitize and return the outer serialization of the root element
    /// (spec §6 `sanitizeToDOM`).
    pub fn sanitize_to_dom(&self, input: &str, config: Option<&Config>) -> String {
        self.sanitize(input, config)
    }

    /// Sanitize and return `{ html, firstChildNodeValue? }` (spec §6
    /// `sanitizeToFragment`).
    pub fn sanitize_to_fragment(&self, input: &str, config: Option<&Config>) -> FragmentOutput {
        let Ok((tree, resolved, _)) = self.sanitize_tree_inner(input, config) else {
            return FragmentOutput { html: String::new(), first_child_node_value: None };
        };
        let html = serialize::serialize_inner(&tree, resolved.parser_media_type);
        let first_child_node_value = tree.borrow().children.first().and_then(|c| match &c.borrow().data {
            dom::NodeData::Text(t) | dom::NodeData::RawData(t) => Some(t.clone()),
            _ => None,
        });
        FragmentOutput { html, first_child_node_value }
    }

    /// Sanitize a whole document and return `{ html, headHTML?, bodyHTML? }`
    /// (spec §6 `sanitizeToDocument`).
    pub fn sanitize_to_document(&self, input: &str, config: Option<&Config>) -> DocumentOutput {
        let mut whole_doc_config = config.cloned().unwrap_or_else(|| self.effective_config(None));
        whole_doc_config.whole_document = true;
        let Ok((tree, resolved, _)) = self.sanitize_tree_inner(input, Some(&whole_doc_config)) else {
            return DocumentOutput { html: String::new(), head_html: None, body_html: None };
        };
        let html = serialize::serialize(&tree, resolved.parser_media_type);
        let head_html = find_child_by_tag(&tree, "head").map(|n| serialize::serialize_inner_html(&n));
        let body_html = find_child_by_tag(&tree, "body").map(|n| serialize::serialize_inner_html(&n));
        DocumentOutput { html, head_html, body_html }
    }

    /// Sanitize and return the live, mutable parse tree (spec §6
    /// `sanitizeToDocumentTree`).
    pub fn sanitize_to_document_tree(&self, input: &str, config: Option<&Config>) -> Option<NodeRef> {
        self.sanitize_tree_inner(input, config).ok().map(|(tree, _, _)| tree)
    }

    /// Sanitize and return both the serialized output and the removed-items
    /// log for this call (spec §6 `sanitizeAndGetRemoved`).
    pub fn sanitize_and_get_removed(&self, input: &str, config: Option<&Config>) -> SanitizeOutcome {
        match self.run(input, config) {
            Some((sanitized, removed)) => SanitizeOutcome { sanitized, removed },
            None => SanitizeOutcome { sanitized: String::new(), removed: Vec::new() },
        }
    }

    /// Sanitize `element`'s subtree in place and return it unchanged in
    /// identity (spec §6 `sanitizeInPlace`). Fails with
    /// `ForbiddenRootNode` if the root itself would be removed or unwrapped,
    /// without mutating anything.
    pub fn sanitize_in_place(&self, element: &NodeRef, config: Option<&Config>) -> SanitizeResult<()> {
        let cfg = self.effective_config(config);
        let mut resolved = resolve(&cfg);

        let tag_lower = element.borrow().tag_name().map(|s| s.to_ascii_lowercase());
        if let Some(tag) = &tag_lower {
            let forbidden = resolved.forbid_tags.contains(tag) || !resolved.allowed_tags.contains(tag);
            let is_custom_ok = attrs::is_custom_element(tag) && resolved.matches_custom_tag_check(tag);
            if forbidden && !is_custom_ok {
                return Err(SanitizeError::ForbiddenRootNode { tag_name: tag.clone() });
            }
        }

        let mut removed = RemovedLog::new();
        self.fire_hooks(|hooks| traverse::sanitize_tree(element, &mut resolved, hooks, &mut removed));
        self.record_removed(removed.into_vec());
        Ok(())
    }

    fn run(&self, input: &str, config: Option<&Config>) -> Option<(String, Vec<Removed>)> {
        let (tree, resolved, removed) = self.sanitize_tree_inner(input, config).ok()?;
        let html = serialize::serialize_inner(&tree, resolved.parser_media_type);
        Some((html, removed))
    }

    /// Parse, sanitize, and return the resulting tree together with the
    /// config it was resolved against and the removed-items log for this
    /// call. Every public entry point that needs a removed-items count
    /// reads it straight from here rather than through [`Self::record_removed`],
    /// which only mirrors the result into [`GlobalState`] for `Sanitizer::Global`
    /// — a `Scoped` sanitizer has nowhere else to keep it.
    fn sanitize_tree_inner(
        &self,
        input: &str,
        config: Option<&Config>,
    ) -> SanitizeResult<(NodeRef, ResolvedConfig, Vec<Removed>)> {
        let cfg = self.effective_config(config);
        let mut resolved = resolve(&cfg);

        let tree = if resolved.parser_media_type == MediaType::Xhtml {
            let wrapped = xhtml::wrap_for_xhtml(input, resolved.whole_document, &resolved.namespace_uri);
            let document = xhtml::parse_xhtml(&wrapped)?;
            if resolved.whole_document {
                document
            } else {
                xhtml::unwrap_template_root(&document)
            }
        } else {
            let pre = preprocess::preprocess(input, resolved.force_body);
            let document = if resolved.whole_document {
                html::parse_html_document(&pre.html)?
            } else {
                html::parse_html_fragment(&pre.html)?
            };
            preprocess::postprocess(&document, &pre);
            document
        };

        let mut removed = RemovedLog::new();
        self.fire_hooks(|hooks| traverse::sanitize_tree(&tree, &mut resolved, hooks, &mut removed));
        let removed = removed.into_vec();
        self.record_removed(removed.clone());

        Ok((tree, resolved, removed))
    }
}

fn find_child_by_tag(root: &NodeRef, tag: &str) -> Option<NodeRef> {
    if root.borrow().tag_name() == Some(tag) {
        return Some(root.clone());
    }
    for child in root.borrow().children.clone() {
        if let Some(found) = find_child_by_tag(&child, tag) {
            return Some(found);
        }
    }
    None
}

/// Install a persistent default configuration for [`Sanitizer::global`]
/// calls (spec §6 `setConfig`).
pub fn set_config(config: Config) {
    GLOBAL.lock().borrow_mut().persistent_config = Some(config);
}

/// Remove the persistent default configuration (spec §6 `clearConfig`).
pub fn clear_config() {
    GLOBAL.lock().borrow_mut().persistent_config = None;
}

/// Parse, sanitize, and serialize `input` using the global sanitizer (spec
/// §6 `sanitize`).
pub fn sanitize(input: &str, config: Option<&Config>) -> String {
    Sanitizer::global().sanitize(input, config)
}

/// See [`Sanitizer::sanitize_to_dom`].
pub fn sanitize_to_dom(input: &str, config: Option<&Config>) -> String {
    Sanitizer::global().sanitize_to_dom(input, config)
}

/// See [`Sanitizer::sanitize_to_fragment`].
pub fn sanitize_to_fragment(input: &str, config: Option<&Config>) -> FragmentOutput {
    Sanitizer::global().sanitize_to_fragment(input, config)
}

/// See [`Sanitizer::sanitize_to_document`].
pub fn sanitize_to_document(input: &str, config: Option<&Config>) -> DocumentOutput {
    Sanitizer::global().sanitize_to_document(input, config)
}

/// See [`Sanitizer::sanitize_to_document_tree`].
pub fn sanitize_to_document_tree(input: &str, config: Option<&Config>) -> Option<NodeRef> {
    Sanitizer::global().sanitize_to_document_tree(input, config)
}

/// See [`Sanitizer::sanitize_and_get_removed`].
pub fn sanitize_and_get_removed(input: &str, config: Option<&Config>) -> SanitizeOutcome {
    Sanitizer::global().sanitize_and_get_removed(input, config)
}

/// See [`Sanitizer::sanitize_in_place`].
pub fn sanitize_in_place(element: &NodeRef, config: Option<&Config>) -> SanitizeResult<()> {
    Sanitizer::global().sanitize_in_place(element, config)
}

/// Register a hook against the global registry (spec §6 `addHook`).
pub fn add_hook<F>(phase: HookPhase, f: F) -> HookHandle
where
    F: for<'a> Fn(&NodeRef, Option<&mut hooks::HookEvent<'a>>) + Send + Sync + 'static,
{
    Sanitizer::global().add_hook(phase, f)
}

/// See [`Sanitizer::remove_hook`].
pub fn remove_hook(phase: HookPhase, handle: &HookHandle) -> Option<HookHandle> {
    Sanitizer::global().remove_hook(phase, handle)
}

/// See [`Sanitizer::remove_hooks`].
pub fn remove_hooks(phase: HookPhase) {
    Sanitizer::global().remove_hooks(phase);
}

/// See [`Sanitizer::remove_all_hooks`].
pub fn remove_all_hooks() {
    Sanitizer::global().remove_all_hooks();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_strips_script_and_event_handler() {
        let sanitizer = Sanitizer::builder();
        let out = sanitizer.sanitize(r#"<img src=x onerror=alert(1)>"#, None);
        assert_eq!(out, r#"<img src="x">"#);
    }

    #[test]
    fn script_element_is_dropped_but_trailing_text_kept() {
        let sanitizer = Sanitizer::builder();
        let out = sanitizer.sanitize("<script>alert(1)</script>hello", None);
        assert_eq!(out, "hello");
    }

    #[test]
    fn javascript_href_is_stripped() {
        let sanitizer = Sanitizer::builder();
        let out = sanitizer.sanitize(r#"<a href="javascript:alert(1)">x</a>"#, None);
        assert_eq!(out, "<a>x</a>");
    }

    #[test]
    fn unknown_tag_is_unwrapped() {
        let sanitizer = Sanitizer::builder();
        let out = sanitizer.sanitize("<foobar>abc</foobar>", None);
        assert_eq!(out, "abc");
    }

    #[test]
    fn safe_for_templates_blanks_mustache_expression() {
        let cfg = Config::builder().safe_for_templates(true).build();
        let sanitizer = Sanitizer::builder();
        let out = sanitizer.sanitize("<div>{{v}}</div>", Some(&cfg));
        assert_eq!(out, "<div> </div>");
    }

    #[test]
    fn force_keep_attr_hook_preserves_onclick() {
        let mut sanitizer = Sanitizer::builder();
        let cfg = Config::builder().allowed_tags(["a"]).build();
        sanitizer.add_hook(HookPhase::UponSanitizeAttribute, |_node, event| {
            if let Some(event) = event {
                if event.attr_name.as_deref() == Some("onclick") {
                    event.force_keep_attr = Some(true);
                }
            }
        });
        let out = sanitizer.sanitize(r#"<a onclick="alert(1)">x</a>"#, Some(&cfg));
        assert!(out.contains(r#"onclick="alert(1)""#));
    }

    #[test]
    fn removed_log_counts_one_for_dropped_script() {
        let sanitizer = Sanitizer::global();
        let outcome = sanitizer.sanitize_and_get_removed("<script>alert(1)</script><div>x</div>", None);
        assert_eq!(outcome.removed.len(), 1);
    }

    #[test]
    fn removed_log_counts_one_for_dropped_comment() {
        let sanitizer = Sanitizer::global();
        let outcome = sanitizer.sanitize_and_get_removed("<!--boom-->", None);
        assert_eq!(outcome.removed.len(), 1);
    }

    #[test]
    fn sanitize_in_place_rejects_forbidden_root() {
        let div = dom::Node::new(dom::NodeData::Element(dom::ElementData {
            name: dom::QualName::plain("script"),
            attrs: vec![],
        }));
        let err = Sanitizer::global().sanitize_in_place(&div, None).unwrap_err();
        assert!(matches!(err, SanitizeError::ForbiddenRootNode { .. }));
    }

    #[test]
    fn scoped_sanitizer_reports_its_own_removed_items() {
        let sanitizer = Sanitizer::builder();
        let outcome =
            sanitizer.sanitize_and_get_removed("<script>alert(1)</script><div>x</div>", None);
        assert_eq!(outcome.removed.len(), 1);
    }
}

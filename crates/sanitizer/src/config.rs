//! Caller-facing configuration (spec §3) and the resolver that normalizes
//! it into the form the traversal/attribute-filter stages consume
//! (spec §4.1).

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "application/xhtml+xml")]
    Xhtml,
}

impl Default for MediaType {
    fn default() -> Self {
        MediaType::Html
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Profile {
    Html,
    Svg,
    SvgFilters,
    MathMl,
}

/// Caller-supplied, unresolved configuration (spec §3 "Configuration").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub allowed_tags: Option<HashSet<String>>,
    pub allowed_attributes: Option<HashSet<String>>,
    pub forbid_tags: HashSet<String>,
    pub forbid_attributes: HashSet<String>,
    pub add_tags: HashSet<String>,
    pub add_attributes: HashSet<String>,
    pub data_uri_tags: Option<HashSet<String>>,
    pub uri_safe_attributes: Option<HashSet<String>>,
    pub forbid_contents: Option<HashSet<String>>,
    pub allowed_namespace_uris: Option<HashSet<String>>,

    pub allow_data_attributes: Option<bool>,
    pub allow_aria_attributes: Option<bool>,
    pub allow_unknown_protocols: bool,
    pub allow_self_close_in_attributes: Option<bool>,
    pub safe_for_xml: Option<bool>,
    pub safe_for_templates: bool,
    pub whole_document: bool,
    pub force_body: bool,
    pub keep_content: Option<bool>,
    pub sanitize_dom: Option<bool>,
    pub sanitize_named_props: bool,

    pub parser_media_type: MediaType,
    pub namespace_uri: Option<String>,

    pub use_profiles: Option<HashSet<Profile>>,
    pub allowed_uri_regexp: Option<String>,
    pub custom_element_handling: Option<CustomElementHandling>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomElementHandling {
    pub tag_name_check: Option<String>,
    pub attribute_name_check: Option<String>,
    pub allow_customized_built_in_elements: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Is this the structural default (spec §4.1 "If it is *not* the
    /// structural default")? Used to skip the resolver's normalization work
    /// entirely for the common case.
    fn is_structural_default(&self) -> bool {
        self.allowed_tags.is_none()
            && self.allowed_attributes.is_none()
            && self.forbid_tags.is_empty()
            && self.forbid_attributes.is_empty()
            && self.add_tags.is_empty()
            && self.add_attributes.is_empty()
            && self.use_profiles.is_none()
            && !self.whole_document
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn allowed_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.allowed_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_attributes(mut self, attrs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.allowed_attributes = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn add_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.add_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn add_attributes(mut self, attrs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.add_attributes.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn forbid_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.forbid_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn forbid_attributes(mut self, attrs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cfg.forbid_attributes.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn use_profiles(mut self, profiles: impl IntoIterator<Item = Profile>) -> Self {
        self.cfg.use_profiles = Some(profiles.into_iter().collect());
        self
    }

    pub fn safe_for_templates(mut self, v: bool) -> Self {
        self.cfg.safe_for_templates = v;
        self
    }

    pub fn whole_document(mut self, v: bool) -> Self {
        self.cfg.whole_document = v;
        self
    }

    pub fn force_body(mut self, v: bool) -> Self {
        self.cfg.force_body = v;
        self
    }

    pub fn parser_media_type(mut self, t: MediaType) -> Self {
        self.cfg.parser_media_type = t;
        self
    }

    pub fn allowed_uri_regexp(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.allowed_uri_regexp = Some(pattern.into());
        self
    }

    pub fn build(self) -> Config {
        self.cfg
    }
}

/// The normalized, fully-expanded configuration the traversal and
/// attribute-filter stages actually consult. Immutable for the duration of
/// one sanitize call (spec §3 "Lifecycle").
pub struct ResolvedConfig {
    pub allowed_tags: HashSet<String>,
    pub allowed_attributes: HashSet<String>,
    pub forbid_tags: HashSet<String>,
    pub forbid_attributes: HashSet<String>,
    pub data_uri_tags: HashSet<String>,
    pub uri_safe_attributes: HashSet<String>,
    pub forbid_contents: HashSet<String>,
    pub allowed_namespace_uris: HashSet<String>,

    pub allow_data_attributes: bool,
    pub allow_aria_attributes: bool,
    pub allow_unknown_protocols: bool,
    pub allow_self_close_in_attributes: bool,
    pub safe_for_xml: bool,
    pub safe_for_templates: bool,
    pub whole_document: bool,
    pub force_body: bool,
    pub keep_content: bool,
    pub sanitize_dom: bool,
    pub sanitize_named_props: bool,

    pub parser_media_type: MediaType,
    pub namespace_uri: String,

    pub allowed_uri_regexp: Option<Regex>,
    pub tag_name_check: Option<Regex>,
    pub attribute_name_check: Option<Regex>,
    pub allow_customized_built_in_elements: bool,
}

fn compile_or_warn(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "user-supplied pattern failed to compile; disabling the check it guards");
            None
        }
    }
}

impl ResolvedConfig {
    pub fn uri_is_allowed_by_user_regexp(&self, value: &str) -> Option<bool> {
        self.allowed_uri_regexp.as_ref().map(|re| re.is_match(value))
    }

    pub fn matches_custom_tag_check(&self, tag: &str) -> bool {
        match &self.tag_name_check {
            Some(re) => re.is_match(tag),
            None => false,
        }
    }

    pub fn matches_custom_attribute_check(&self, attr: &str) -> bool {
        match &self.attribute_name_check {
            Some(re) => re.is_match(attr),
            None => false,
        }
    }
}

fn lowercase_set(set: &HashSet<String>) -> HashSet<String> {
    set.iter().map(|s| s.to_ascii_lowercase()).collect()
}

/// Resolve a caller `Config` into a `ResolvedConfig` (spec §4.1).
pub fn resolve(cfg: &Config) -> ResolvedConfig {
    if cfg.is_structural_default() {
        tracing::trace!("config is the structural default; normalization steps are no-ops");
    }
    let is_xhtml = cfg.parser_media_type == MediaType::Xhtml;

    let mut allowed_tags: HashSet<String> = cfg
        .allowed_tags
        .clone()
        .unwrap_or_else(|| defaults::HTML_TAGS.iter().map(|s| s.to_string()).collect());
    let mut allowed_attributes: HashSet<String> = cfg
        .allowed_attributes
        .clone()
        .unwrap_or_else(|| defaults::HTML_ATTRS.iter().map(|s| s.to_string()).collect());
    let mut forbid_tags = cfg.forbid_tags.clone();
    let mut forbid_attributes = cfg.forbid_attributes.clone();

    if !is_xhtml {
        // Step 1: lowercase every string in the tag/attribute sets.
        allowed_tags = lowercase_set(&allowed_tags);
        allowed_attributes = lowercase_set(&allowed_attributes);
        forbid_tags = lowercase_set(&forbid_tags);
        forbid_attributes = lowercase_set(&forbid_attributes);
    }

    // Step 2: profiles reset the allow sets to {#text} / {} then union in
    // the per-profile universes.
    if let Some(profiles) = &cfg.use_profiles {
        allowed_tags = HashSet::new();
        allowed_tags.insert("#text".to_string());
        allowed_attributes = HashSet::new();

        for profile in profiles {
            match profile {
                Profile::Html => {
                    allowed_tags.extend(defaults::HTML_TAGS.iter().map(|s| s.to_string()));
                    allowed_attributes.extend(defaults::HTML_ATTRS.iter().map(|s| s.to_string()));
                }
                Profile::Svg => {
                    allowed_tags.extend(defaults::SVG_TAGS.iter().map(|s| s.to_string()));
                    allowed_attributes.extend(defaults::SVG_ATTRS.iter().map(|s| s.to_string()));
                    allowed_attributes.extend(defaults::XML_ATTRS.iter().map(|s| s.to_string()));
                }
                Profile::SvgFilters => {
                    allowed_tags.extend(defaults::SVG_FILTER_TAGS.iter().map(|s| s.to_string()));
                }
                Profile::MathMl => {
                    allowed_tags.extend(defaults::MATHML_TAGS.iter().map(|s| s.to_string()));
                    allowed_attributes.extend(defaults::MATHML_ATTRS.iter().map(|s| s.to_string()));
                    allowed_attributes.extend(defaults::XML_ATTRS.iter().map(|s| s.to_string()));
                }
            }
        }
    }

    // Step 3: union addTags/addAttributes.
    allowed_tags.extend(cfg.add_tags.iter().map(|s| if is_xhtml { s.clone() } else { s.to_ascii_lowercase() }));
    allowed_attributes.extend(cfg.add_attributes.iter().map(|s| if is_xhtml { s.clone() } else { s.to_ascii_lowercase() }));

    // Step 4: wholeDocument / table implications.
    if cfg.whole_document {
        for t in ["html", "head", "body"] {
            allowed_tags.insert(t.to_string());
        }
    }
    if allowed_tags.contains("table") {
        allowed_tags.insert("tbody".to_string());
        forbid_tags.remove("tbody");
    }

    // A small core stays forbidden even if a caller adds it to
    // `allowedTags` — unlike `forbidTags`, this set cannot be un-forbidden.
    forbid_tags.extend(defaults::ALWAYS_FORBIDDEN_TAGS.iter().map(|s| s.to_string()));

    let data_uri_tags = cfg
        .data_uri_tags
        .clone()
        .unwrap_or_else(|| defaults::DATA_URI_TAGS.iter().map(|s| s.to_string()).collect());
    let uri_safe_attributes = cfg
        .uri_safe_attributes
        .clone()
        .unwrap_or_else(|| defaults::URI_SAFE_ATTRS.iter().map(|s| s.to_string()).collect());
    let forbid_contents = cfg
        .forbid_contents
        .clone()
        .unwrap_or_else(|| defaults::DEFAULT_FORBID_CONTENTS.iter().map(|s| s.to_string()).collect());
    let allowed_namespace_uris = cfg.allowed_namespace_uris.clone().unwrap_or_else(|| {
        [crate::namespace::HTML_NS, crate::namespace::SVG_NS, crate::namespace::MATHML_NS]
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    });

    let (tag_name_check, attribute_name_check, allow_customized_built_in_elements) =
        match &cfg.custom_element_handling {
            Some(h) => (
                h.tag_name_check.as_deref().and_then(compile_or_warn),
                h.attribute_name_check.as_deref().and_then(compile_or_warn),
                h.allow_customized_built_in_elements,
            ),
            None => (None, None, false),
        };

    ResolvedConfig {
        allowed_tags,
        allowed_attributes,
        forbid_tags,
        forbid_attributes,
        data_uri_tags,
        uri_safe_attributes,
        forbid_contents,
        allowed_namespace_uris,

        allow_data_attributes: cfg.allow_data_attributes.unwrap_or(true),
        allow_aria_attributes: cfg.allow_aria_attributes.unwrap_or(true),
        allow_unknown_protocols: cfg.allow_unknown_protocols,
        allow_self_close_in_attributes: cfg.allow_self_close_in_attributes.unwrap_or(true),
        safe_for_xml: cfg.safe_for_xml.unwrap_or(true),
        safe_for_templates: cfg.safe_for_templates,
        whole_document: cfg.whole_document,
        force_body: cfg.force_body,
        keep_content: cfg.keep_content.unwrap_or(true),
        sanitize_dom: cfg.sanitize_dom.unwrap_or(true),
        sanitize_named_props: cfg.sanitize_named_props,

        parser_media_type: cfg.parser_media_type,
        namespace_uri: cfg.namespace_uri.clone().unwrap_or_else(|| crate::namespace::HTML_NS.to_string()),

        allowed_uri_regexp: cfg.allowed_uri_regexp.as_deref().and_then(compile_or_warn),
        tag_name_check,
        attribute_name_check,
        allow_customized_built_in_elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_to_html_defaults() {
        let resolved = resolve(&Config::default());
        assert!(resolved.allowed_tags.contains("div"));
        assert!(!resolved.allowed_tags.contains("script"));
        assert!(resolved.allow_data_attributes);
    }

    #[test]
    fn profiles_reset_then_union_svg() {
        let cfg = Config::builder().use_profiles([Profile::Svg]).build();
        let resolved = resolve(&cfg);
        assert!(resolved.allowed_tags.contains("svg"));
        assert!(resolved.allowed_tags.contains("#text"));
        assert!(!resolved.allowed_tags.contains("div"));
        assert!(resolved.allowed_attributes.contains("xlink:href"));
    }

    #[test]
    fn whole_document_implies_html_head_body() {
        let cfg = Config::builder().whole_document(true).build();
        let resolved = resolve(&cfg);
        assert!(resolved.allowed_tags.contains("html"));
        assert!(resolved.allowed_tags.contains("head"));
        assert!(resolved.allowed_tags.contains("body"));
    }

    #[test]
    fn table_implies_tbody_and_unforbids_it() {
        let cfg = Config::builder().allowed_tags(["table"]).forbid_tags(["tbody"]).build();
        let resolved = resolve(&cfg);
        assert!(resolved.allowed_tags.contains("tbody"));
        assert!(!resolved.forbid_tags.contains("tbody"));
    }

    #[test]
    fn invalid_user_regexp_disables_the_check() {
        let cfg = Config::builder().allowed_uri_regexp("(").build();
        let resolved = resolve(&cfg);
        assert!(resolved.allowed_uri_regexp.is_none());
    }

    #[test]
    fn non_xhtml_lowercases_user_tags() {
        let cfg = Config::builder().allowed_tags(["DIV", "SPAN"]).build();
        let resolved = resolve(&cfg);
        assert!(resolved.allowed_tags.contains("div"));
        assert!(resolved.allowed_tags.contains("span"));
    }
}

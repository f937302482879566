//! Compiled default allow/deny tables (spec §2 "Default allow/deny tables",
//! §4.1 profile subsets). Mirrors the shape of the teacher crate's
//! `SecurityContext::new` element/attribute sets, generalized to the full
//! HTML+SVG+MathML universe and split by profile the way spec §4.1 requires.

use once_cell::sync::Lazy;
use std::collections::HashSet;

macro_rules! set {
    ($($s:expr),* $(,)?) => {{
        let mut s = HashSet::new();
        $(s.insert($s);)*
        s
    }};
}

pub static HTML_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "a", "abbr", "acronym", "address", "area", "article", "aside", "audio", "b", "bdi",
        "bdo", "big", "blink", "blockquote", "body", "br", "button", "canvas", "caption",
        "center", "cite", "code", "col", "colgroup", "content", "data", "datalist", "dd", "decorator",
        "del", "details", "dfn", "dialog", "dir", "div", "dl", "dt", "element", "em", "fieldset",
        "figcaption", "figure", "font", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
        "head", "header", "hgroup", "hr", "html", "i", "img", "input", "ins", "kbd", "label",
        "legend", "li", "main", "map", "mark", "marquee", "menu", "menuitem", "meter", "nav",
        "nobr", "ol", "optgroup", "option", "output", "p", "picture", "pre", "progress", "q",
        "rp", "rt", "ruby", "s", "samp", "section", "select", "shadow", "small", "source",
        "spacer", "span", "strike", "strong", "style", "sub", "summary", "sup", "table", "tbody",
        "td", "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track",
        "tt", "u", "ul", "var", "video", "wbr", "meta", "link", "base", "noscript",
    ]
});

pub static HTML_ATTRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "accept", "action", "align", "alt", "autocapitalize", "autocomplete", "autopictureinpicture",
        "autoplay", "background", "bgcolor", "border", "capture", "cellpadding", "cellspacing",
        "checked", "cite", "class", "clear", "color", "cols", "colspan", "controls",
        "controlslist", "coords", "crossorigin", "datetime", "decoding", "default", "dir",
        "disabled", "disablepictureinpicture", "disableremoteplayback", "download", "draggable",
        "enctype", "enterkeyhint", "face", "for", "headers", "height", "hidden", "high", "href",
        "hreflang", "id", "inputmode", "integrity", "ismap", "kind", "label", "lang", "list",
        "loading", "loop", "low", "max", "maxlength", "media", "method", "min", "minlength",
        "multiple", "muted", "name", "nonce", "noshade", "novalidate", "nowrap", "open",
        "optimum", "pattern", "placeholder", "playsinline", "popover", "popovertarget",
        "popovertargetaction", "poster", "preload", "pubdate", "radiogroup", "readonly", "rel",
        "required", "rev", "reversed", "role", "rows", "rowspan", "spellcheck", "scope",
        "selected", "shape", "size", "sizes", "span", "srclang", "start", "src", "srcset",
        "step", "style", "summary", "tabindex", "title", "translate", "type", "usemap",
        "valign", "value", "width", "xmlns", "slot",
    ]
});

pub static SVG_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "svg", "a", "altglyph", "altglyphdef", "altglyphitem", "animatecolor", "animatemotion",
        "animatetransform", "circle", "clippath", "defs", "desc", "ellipse", "filter", "font",
        "g", "glyph", "glyphref", "hkern", "image", "line", "lineargradient", "marker", "mask",
        "metadata", "mpath", "path", "pattern", "polygon", "polyline", "radialgradient", "rect",
        "stop", "style", "switch", "symbol", "text", "textpath", "title", "tref", "tspan",
        "view", "vkern",
    ]
});

/// SVG filter primitives, allowed separately under the `svgFilters` profile
/// (spec §4.1).
pub static SVG_FILTER_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "fecolormatrix", "fecomposite", "feflood", "fegaussianblur", "femerge", "femergenode",
        "feoffset", "feblend", "fecolormatrix", "fetile", "fecomponenttransfer", "fefunca",
        "fefuncb", "fefuncg", "fefuncr", "feconvolvematrix", "fedisplacementmap",
        "fedropshadow", "fediffuselighting", "fespecularlighting", "feimage", "femorphology",
        "feturbulence", "fedistantlight", "fepointlight", "fespotlight",
    ]
});

pub static SVG_ATTRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "accent-height", "accumulate", "additive", "alignment-baseline", "ascent", "attributename",
        "attributetype", "azimuth", "basefrequency", "baseline-shift", "begin", "bias", "by",
        "class", "clip", "clippathunits", "clip-path", "clip-rule", "color", "color-interpolation",
        "color-interpolation-filters", "color-profile", "color-rendering", "cx", "cy", "d",
        "dx", "dy", "diffuseconstant", "direction", "display", "divisor", "dur", "edgemode",
        "elevation", "end", "fill", "fill-opacity", "fill-rule", "filter", "filterunits",
        "flood-color", "flood-opacity", "font-family", "font-size", "font-size-adjust",
        "font-stretch", "font-style", "font-variant", "font-weight", "fx", "fy", "g1", "g2",
        "glyph-name", "glyphref", "gradientunits", "gradienttransform", "height", "href", "id",
        "image-rendering", "in", "in2", "k", "k1", "k2", "k3", "k4", "kerning", "keypoints",
        "keysplines", "keytimes", "lang", "lengthadjust", "letter-spacing", "kernelmatrix",
        "kernelunitlength", "lighting-color", "local", "marker-end", "marker-mid",
        "marker-start", "markerheight", "markerunits", "markerwidth", "maskcontentunits",
        "maskunits", "max", "mask", "media", "method", "mode", "min", "name", "numoctaves",
        "offset", "operator", "opacity", "order", "orient", "orientation", "origin",
        "overflow", "paint-order", "path", "pathlength", "patterncontentunits",
        "patterntransform", "patternunits", "points", "preservealpha", "preserveaspectratio",
        "primitiveunits", "r", "rx", "ry", "radius", "refx", "refy", "repeatcount",
        "repeatdur", "restart", "result", "rotate", "scale", "seed", "shape-rendering",
        "specularconstant", "specularexponent", "spreadmethod", "startoffset", "stddeviation",
        "stitchtiles", "stop-color", "stop-opacity", "stroke-dasharray", "stroke-dashoffset",
        "stroke-linecap", "stroke-linejoin", "stroke-miterlimit", "stroke-opacity", "stroke",
        "stroke-width", "style", "surfacescale", "systemlanguage", "tabindex", "targetx",
        "targety", "transform", "transform-origin", "text-anchor", "text-decoration",
        "text-rendering", "textlength", "type", "u1", "u2", "unicode", "values", "viewbox",
        "visibility", "version", "vert-adv-y", "vert-origin-x", "vert-origin-y", "width",
        "word-spacing", "wrap", "writing-mode", "xchannelselector", "ychannelselector", "x",
        "x1", "x2", "xmlns", "y", "y1", "y2", "z", "zoomandpan",
    ]
});

pub static MATHML_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "math", "menclose", "merror", "mfenced", "mfrac", "mglyph", "mi", "mlabeledtr", "mmultiscripts",
        "mn", "mo", "mover", "mpadded", "mphantom", "mroot", "mrow", "ms", "mspace", "msqrt",
        "mstyle", "msub", "msup", "msubsup", "mtable", "mtd", "mtext", "mtr", "munder",
        "munderover", "mprescripts", "annotation", "annotation-xml", "semantics",
    ]
});

pub static MATHML_ATTRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "accent", "accentunder", "align", "bevelled", "close", "columnsalign", "columnlines",
        "columnspan", "denomalign", "depth", "dir", "display", "displaystyle", "encoding",
        "fence", "frame", "height", "href", "id", "largeop", "length", "linethickness", "lspace",
        "lquote", "mathbackground", "mathcolor", "mathsize", "mathvariant", "maxsize", "minsize",
        "movablelimits", "notation", "numalign", "open", "rowalign", "rowlines", "rowspacing",
        "rowspan", "rspace", "rquote", "scriptlevel", "scriptminsize", "scriptsizemultiplier",
        "selection", "separator", "separators", "stretchy", "subscriptshift", "supscriptshift",
        "symmetric", "voffset", "width", "xlink:href", "xlink:type", "xmlns", "xmlns:xlink",
    ]
});

/// XML attributes unioned in for the SVG/MathML profiles (spec §4.1 step 2).
pub static XML_ATTRS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| set!["xlink:href", "xml:id", "xml:space", "xlink:title", "xmlns:xlink"]);

/// Tags whose `src`/`href` may carry a `data:` URI (spec §4.5 validity
/// check, "data-URI allow list").
pub static DATA_URI_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| set!["audio", "video", "img", "source", "image", "track"]);

/// Attributes whose value is a trusted, pre-vetted URI regardless of scheme
/// (spec §3 `uriSafeAttributes`, §4.5 "accept" step).
pub static URI_SAFE_ATTRS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| set!["background", "cite", "href", "itemtype", "longdesc", "poster", "src", "xlink:href"]);

/// Elements always dropped outright, never unwrapped (spec §4.4 step 2,
/// `forbidContents`-independent default — these additionally seed
/// `forbidContents` unless the caller opts back in via `addTags`).
pub static DEFAULT_FORBID_CONTENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "annotation-xml", "audio", "colgroup", "desc", "foreignobject", "head", "iframe", "math",
        "mi", "mn", "mo", "ms", "mtext", "noembed", "noframes", "noscript", "plaintext", "script",
        "style", "svg", "template", "thead", "title", "video", "xmp",
    ]
});

/// Tags that are always forbidden even if present in `allowedTags` (spec
/// §3 implies `script` et al. are the intrinsically dangerous core; the
/// resolver still lets `forbidTags` add to this, it never subtracts).
pub static ALWAYS_FORBIDDEN_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| set!["script", "style", "iframe", "object", "embed", "frame", "frameset", "base"]);

/// HTML void elements — serialized with no closing tag (spec §4.6).
pub static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
        "param", "source", "track", "wbr",
    ]
});

/// Property names that would clobber a `Document`/`Window` builtin if used
/// as an `id`/`name` value (spec §4.5, GLOSSARY "Clobber").
pub static CLOBBER_PRONE_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    set![
        "attributes", "body", "childNodes", "cookie", "documentURI", "firstChild", "forms",
        "innerHTML", "lastChild", "location", "nodeName", "nodeType", "nodeValue",
        "parentNode", "style", "submit", "textContent", "title",
    ]
});

/// Canonical SVG tag/attribute camelCase spellings, restored by the
/// serializer (spec §4.6, "SVG tag/attr names are re-cased").
pub static SVG_CAMEL_CASE: Lazy<std::collections::HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = std::collections::HashMap::new();
    for (lower, camel) in [
        ("altglyph", "altGlyph"),
        ("altglyphdef", "altGlyphDef"),
        ("altglyphitem", "altGlyphItem"),
        ("animatecolor", "animateColor"),
        ("animatemotion", "animateMotion"),
        ("animatetransform", "animateTransform"),
        ("clippath", "clipPath"),
        ("feblend", "feBlend"),
        ("fecolormatrix", "feColorMatrix"),
        ("fecomponenttransfer", "feComponentTransfer"),
        ("fecomposite", "feComposite"),
        ("feconvolvematrix", "feConvolveMatrix"),
        ("fediffuselighting", "feDiffuseLighting"),
        ("fedisplacementmap", "feDisplacementMap"),
        ("fedistantlight", "feDistantLight"),
        ("fedropshadow", "feDropShadow"),
        ("feflood", "feFlood"),
        ("fefunca", "feFuncA"),
        ("fefuncb", "feFuncB"),
        ("fefuncg", "feFuncG"),
        ("fefuncr", "feFuncR"),
        ("fegaussianblur", "feGaussianBlur"),
        ("feimage", "feImage"),
        ("femerge", "feMerge"),
        ("femergenode", "feMergeNode"),
        ("femorphology", "feMorphology"),
        ("feoffset", "feOffset"),
        ("fepointlight", "fePointLight"),
        ("fespecularlighting", "feSpecularLighting"),
        ("fespotlight", "feSpotLight"),
        ("fetile", "feTile"),
        ("feturbulence", "feTurbulence"),
        ("foreignobject", "foreignObject"),
        ("glyphref", "glyphRef"),
        ("lineargradient", "linearGradient"),
        ("radialgradient", "radialGradient"),
        ("textpath", "textPath"),
        ("attributename", "attributeName"),
        ("attributetype", "attributeType"),
        ("basefrequency", "baseFrequency"),
        ("diffuseconstant", "diffuseConstant"),
        ("clippathunits", "clipPathUnits"),
        ("edgemode", "edgeMode"),
        ("filterunits", "filterUnits"),
        ("glyphref", "glyphRef"),
        ("gradienttransform", "gradientTransform"),
        ("gradientunits", "gradientUnits"),
        ("kernelmatrix", "kernelMatrix"),
        ("kernelunitlength", "kernelUnitLength"),
        ("keypoints", "keyPoints"),
        ("keysplines", "keySplines"),
        ("keytimes", "keyTimes"),
        ("lengthadjust", "lengthAdjust"),
        ("limitingconeangle", "limitingConeAngle"),
        ("markerheight", "markerHeight"),
        ("markerunits", "markerUnits"),
        ("markerwidth", "markerWidth"),
        ("maskcontentunits", "maskContentUnits"),
        ("maskunits", "maskUnits"),
        ("numoctaves", "numOctaves"),
        ("pathlength", "pathLength"),
        ("patterncontentunits", "patternContentUnits"),
        ("patterntransform", "patternTransform"),
        ("patternunits", "patternUnits"),
        ("points", "points"),
        ("preservealpha", "preserveAlpha"),
        ("preserveaspectratio", "preserveAspectRatio"),
        ("primitiveunits", "primitiveUnits"),
        ("refx", "refX"),
        ("refy", "refY"),
        ("repeatcount", "repeatCount"),
        ("repeatdur", "repeatDur"),
        ("specularconstant", "specularConstant"),
        ("specularexponent", "specularExponent"),
        ("spreadmethod", "spreadMethod"),
        ("startoffset", "startOffset"),
        ("stddeviation", "stdDeviation"),
        ("stitchtiles", "stitchTiles"),
        ("surfacescale", "surfaceScale"),
        ("systemlanguage", "systemLanguage"),
        ("tablevalues", "tableValues"),
        ("targetx", "targetX"),
        ("targety", "targetY"),
        ("textlength", "textLength"),
        ("viewbox", "viewBox"),
        ("viewtarget", "viewTarget"),
        ("xchannelselector", "xChannelSelector"),
        ("ychannelselector", "yChannelSelector"),
        ("zoomandpan", "zoomAndPan"),
    ] {
        m.insert(lower, camel);
    }
    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_always_forbidden() {
        assert!(ALWAYS_FORBIDDEN_TAGS.contains("script"));
        assert!(!HTML_TAGS.contains("script"));
    }

    #[test]
    fn void_elements_cover_img_and_br() {
        assert!(VOID_ELEMENTS.contains("img"));
        assert!(VOID_ELEMENTS.contains("br"));
        assert!(!VOID_ELEMENTS.contains("div"));
    }

    #[test]
    fn svg_camel_case_restores_viewbox() {
        assert_eq!(SVG_CAMEL_CASE.get("viewbox"), Some(&"viewBox"));
        assert_eq!(SVG_CAMEL_CASE.get("feblend"), Some(&"feBlend"));
    }
}

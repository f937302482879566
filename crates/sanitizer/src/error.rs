//! Crate-wide error types (spec §7).
//!
//! Two kinds: recoverable (swallowed at the public API boundary, the call
//! still publishes its `removed` log) and fatal (`ForbiddenRootNode`,
//! surfaced only by `sanitize_in_place`).

#[derive(thiserror::Error, Debug)]
pub enum SanitizeError {
    #[error("root node <{tag_name}> would itself be removed or unwrapped")]
    ForbiddenRootNode { tag_name: String },

    #[error("failed to parse input as HTML: {0}")]
    HtmlParse(String),

    #[error("failed to parse input as XHTML: {0}")]
    XhtmlParse(String),

    #[error("invalid node operation: {0}")]
    Dom(#[from] crate::dom::DomError),
}

pub type SanitizeResult<T> = Result<T, SanitizeError>;

//! DOM-construction errors for the sanitizer crate.

#[derive(thiserror::Error, Debug)]
pub enum DomError {
    #[error("invalid node operation: {0}")]
    InvalidOperation(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),
}

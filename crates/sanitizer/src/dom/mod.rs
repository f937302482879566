//! The Document Object Model representation sanitized trees are built from.
//!
//! This module defines the node types (`Node`, `ElementData`, `Attr`,
//! `QualName`) and the handful of tree-mutation primitives the HTML/XHTML
//! tree sinks and the traversal core need.

pub mod error;
pub mod node;

pub use error::DomError;
pub use node::{
    append_child, detach, insert_before, parent_of, unwrap_node, Attr, ElementData, Node,
    NodeData, NodeId, NodeRef, QualName,
};

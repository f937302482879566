//! The removed-items log (spec §3 "Removed-items log", §8 invariant 4).
//!
//! Reset at the start of every public entry point and readable afterward via
//! `sanitize_and_get_removed`/`Sanitizer::removed`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    Element { node_name: String },
    Attribute { name: String, from_node_name: String },
}

#[derive(Debug, Default)]
pub struct RemovedLog(Vec<Removed>);

impl RemovedLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push_element(&mut self, node_name: impl Into<String>) {
        self.0.push(Removed::Element { node_name: node_name.into() });
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, from_node_name: impl Into<String>) {
        self.0.push(Removed::Attribute { name: name.into(), from_node_name: from_node_name.into() });
    }

    pub fn as_slice(&self) -> &[Removed] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Removed> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_elements_and_attributes_in_order() {
        let mut log = RemovedLog::new();
        log.push_element("script");
        log.push_attribute("onclick", "a");
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.as_slice(),
            &[
                Removed::Element { node_name: "script".into() },
                Removed::Attribute { name: "onclick".into(), from_node_name: "a".into() },
            ]
        );
    }
}

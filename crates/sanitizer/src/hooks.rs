//! The hook registry (spec §4.7).
//!
//! Hooks are opaque, identity-comparable callables registered against one
//! of nine phases. A `HookEvent` is shared, mutable, per-node/per-attribute
//! scratch space a hook can use to steer the decision the traversal core or
//! attribute filter is about to make.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dom::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeSanitizeElements,
    AfterSanitizeElements,
    BeforeSanitizeAttributes,
    AfterSanitizeAttributes,
    UponSanitizeElement,
    UponSanitizeAttribute,
    BeforeSanitizeShadowDom,
    AfterSanitizeShadowDom,
    UponSanitizeShadowNode,
}

pub const ALL_PHASES: [HookPhase; 9] = [
    HookPhase::BeforeSanitizeElements,
    HookPhase::AfterSanitizeElements,
    HookPhase::BeforeSanitizeAttributes,
    HookPhase::AfterSanitizeAttributes,
    HookPhase::UponSanitizeElement,
    HookPhase::UponSanitizeAttribute,
    HookPhase::BeforeSanitizeShadowDom,
    HookPhase::AfterSanitizeShadowDom,
    HookPhase::UponSanitizeShadowNode,
];

/// A capability object exposing get/set on a live allow-set; writes made by
/// a hook propagate back into the resolved config's set for the remainder
/// of the call (spec §4.7 "allowedTagsProxy").
pub struct AllowSetProxy<'a> {
    set: &'a mut std::collections::HashSet<String>,
}

impl<'a> AllowSetProxy<'a> {
    pub fn new(set: &'a mut std::collections::HashSet<String>) -> Self {
        Self { set }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    pub fn set(&mut self, key: &str, allowed: bool) {
        if allowed {
            self.set.insert(key.to_string());
        } else {
            self.set.remove(key);
        }
    }
}

/// Shared mutable state for a single element or attribute visit (spec
/// §4.7). `UponSanitizeElement`/`UponSanitizeAttribute` events additionally
/// carry a live [`AllowSetProxy`] onto the resolved config's allow-sets, so
/// a hook's edits are visible to the keep/remove decision and the attribute
/// filter for the remainder of the call, not just reflected back in the
/// event itself.
pub struct HookEvent<'a> {
    pub tag_name: Option<String>,
    pub attr_name: Option<String>,
    pub attr_value: Option<String>,
    pub keep_attr: bool,
    pub force_keep_attr: Option<bool>,
    pub allowed_tags_proxy: Option<AllowSetProxy<'a>>,
    pub allowed_attributes_proxy: Option<AllowSetProxy<'a>>,
}

impl<'a> HookEvent<'a> {
    pub fn for_element(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: Some(tag_name.into()),
            attr_name: None,
            attr_value: None,
            keep_attr: true,
            force_keep_attr: None,
            allowed_tags_proxy: None,
            allowed_attributes_proxy: None,
        }
    }

    pub fn for_attribute(attr_name: impl Into<String>, attr_value: impl Into<String>) -> Self {
        Self {
            tag_name: None,
            attr_name: Some(attr_name.into()),
            attr_value: Some(attr_value.into()),
            keep_attr: true,
            force_keep_attr: None,
            allowed_tags_proxy: None,
            allowed_attributes_proxy: None,
        }
    }
}

pub type HookFn = dyn for<'a> Fn(&NodeRef, Option<&mut HookEvent<'a>>) + Send + Sync;

#[derive(Clone)]
pub struct HookHandle {
    id: u64,
    f: Arc<HookFn>,
}

impl HookHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle").field("id", &self.id).finish()
    }
}

impl PartialEq for HookHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for HookHandle {}

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
pub struct HookRegistry {
    phases: HashMap<HookPhase, Vec<HookHandle>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, phase: HookPhase, f: F) -> HookHandle
    where
        F: for<'a> Fn(&NodeRef, Option<&mut HookEvent<'a>>) + Send + Sync + 'static,
    {
        let handle = HookHandle { id: NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed), f: Arc::new(f) };
        self.phases.entry(phase).or_default().push(handle.clone());
        handle
    }

    pub fn add_handle(&mut self, phase: HookPhase, handle: HookHandle) {
        self.phases.entry(phase).or_default().push(handle);
    }

    pub fn pop_last(&mut self, phase: HookPhase) -> Option<HookHandle> {
        self.phases.get_mut(&phase).and_then(|v| v.pop())
    }

    pub fn remove(&mut self, phase: HookPhase, handle: &HookHandle) -> Option<HookHandle> {
        let list = self.phases.get_mut(&phase)?;
        let idx = list.iter().position(|h| h == handle)?;
        Some(list.remove(idx))
    }

    pub fn clear_phase(&mut self, phase: HookPhase) {
        self.phases.remove(&phase);
    }

    pub fn clear_all(&mut self) {
        self.phases.clear();
    }

    pub fn is_empty(&self, phase: HookPhase) -> bool {
        self.phases.get(&phase).map(|v| v.is_empty()).unwrap_or(true)
    }

    /// Run every hook registered for `phase`, in registration order. A
    /// hook that panics is caught and logged rather than propagated (spec
    /// §7 "Hook callbacks that raise should be caught and treated as
    /// no-ops").
    pub fn fire(&self, phase: HookPhase, node: &NodeRef, mut event: Option<&mut HookEvent<'_>>) {
        let Some(hooks) = self.phases.get(&phase) else { return };
        for hook in hooks {
            let result = catch_unwind(AssertUnwindSafe(|| (hook.f)(node, event.as_deref_mut())));
            if result.is_err() {
                tracing::warn!(?phase, hook_id = hook.id, "hook panicked; treating as a no-op for this node");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementData, Node, NodeData, QualName};
    use std::sync::atomic::{AtomicUsize, Ordering as O};

    #[test]
    fn hooks_fire_in_registration_order() {
        let mut registry = HookRegistry::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let o1 = order.clone();
        registry.add(HookPhase::BeforeSanitizeElements, move |_n, _e| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        registry.add(HookPhase::BeforeSanitizeElements, move |_n, _e| o2.lock().unwrap().push(2));

        let node = Node::new(NodeData::Element(ElementData { name: QualName::plain("div"), attrs: vec![] }));
        registry.fire(HookPhase::BeforeSanitizeElements, &node, None);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn remove_hook_by_identity() {
        let mut registry = HookRegistry::new();
        let handle = registry.add(HookPhase::AfterSanitizeElements, |_n, _e| {});
        assert!(!registry.is_empty(HookPhase::AfterSanitizeElements));
        registry.remove(HookPhase::AfterSanitizeElements, &handle);
        assert!(registry.is_empty(HookPhase::AfterSanitizeElements));
    }

    #[test]
    fn panicking_hook_does_not_crash_fire() {
        let mut registry = HookRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.add(HookPhase::UponSanitizeElement, |_n, _e| panic!("boom"));
        let c = calls.clone();
        registry.add(HookPhase::UponSanitizeElement, move |_n, _e| {
            c.fetch_add(1, O::Relaxed);
        });
        let node = Node::new(NodeData::Element(ElementData { name: QualName::plain("div"), attrs: vec![] }));
        registry.fire(HookPhase::UponSanitizeElement, &node, None);
        assert_eq!(calls.load(O::Relaxed), 1);
    }
}

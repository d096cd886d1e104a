//! Instance Tree - persistent nodes behind the element descriptors.
//!
//! Instances live in a slot arena owned by the container. Ownership is still
//! strictly hierarchical: an instance is reachable only through its parent's
//! `children` map (the root through the tree itself), and removing a key from
//! that map means detaching the whole subtree from the arena.
//!
//! ```text
//! root (depth 0, synthetic)
//! └── ""          (depth 1, the rendered element)
//!     ├── "child"     (depth 2)
//!     └── "items.a"   (depth 2)
//! ```

use bitflags::bitflags;
use indexmap::IndexMap;
use slotmap::{SlotMap, new_key_type};

use crate::element::{Component, Element};
use crate::hooks::Hook;
use crate::types::Value;

new_key_type! {
    /// Stable handle to an instance. Handles of destroyed instances never
    /// resolve again, even if the slot is reused.
    pub struct InstanceId;
}

bitflags! {
    /// Per-instance status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstanceFlags: u8 {
        /// The synthetic wrapper that owns the rendered element.
        const ROOT = 1 << 0;
        /// Hook slots are checked out to an execution frame.
        const EXECUTING = 1 << 1;
        /// The last execution returned an error; `result` is from an earlier run.
        const ERRORED = 1 << 2;
    }
}

// =============================================================================
// Instance
// =============================================================================

pub(crate) struct Instance {
    pub component: Component,
    pub props: Value,
    /// Most recent return value, elements included.
    pub result: Value,
    pub key: String,
    pub depth: usize,
    pub parent: Option<InstanceId>,
    /// Positional hook records. Append-only after the first execution.
    pub hooks: Vec<Hook>,
    pub execution_count: u64,
    pub children: IndexMap<String, InstanceId>,
    pub flags: InstanceFlags,
}

impl Instance {
    fn new(component: Component, props: Value, key: String, depth: usize) -> Self {
        Self {
            component,
            props,
            result: Value::Null,
            key,
            depth,
            parent: None,
            hooks: Vec::new(),
            execution_count: 0,
            children: IndexMap::new(),
            flags: InstanceFlags::empty(),
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

pub(crate) struct Tree {
    instances: SlotMap<InstanceId, Instance>,
    root: InstanceId,
}

impl Tree {
    /// Create a tree holding only the root instance.
    pub fn new(component: Component, props: Value) -> Self {
        let mut instances = SlotMap::with_key();
        let mut root = Instance::new(component, props, String::new(), 0);
        root.flags.insert(InstanceFlags::ROOT);
        let root = instances.insert(root);
        Self { instances, root }
    }

    pub fn root(&self) -> InstanceId {
        self.root
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn depth(&self, id: InstanceId) -> Option<usize> {
        self.instances.get(id).map(|instance| instance.depth)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Create a child of `parent` for `element`. The caller records the new
    /// id in the parent's `children` map.
    pub fn insert_child(&mut self, parent: InstanceId, key: String, element: &Element) -> InstanceId {
        let depth = self.depth(parent).map_or(0, |depth| depth + 1);
        let mut instance = Instance::new(
            element.component().clone(),
            element.props().clone(),
            key,
            depth,
        );
        instance.parent = Some(parent);
        self.instances.insert(instance)
    }

    /// Remove `id` and all its descendants from the arena.
    ///
    /// Returned in post-order: every instance comes after all of its
    /// descendants, so releasing them in order tears leaves down first.
    pub fn detach_subtree(&mut self, id: InstanceId) -> Vec<(InstanceId, Instance)> {
        let mut order = Vec::new();
        self.collect_post_order(id, &mut order);
        order
            .into_iter()
            .filter_map(|id| self.instances.remove(id).map(|instance| (id, instance)))
            .collect()
    }

    fn collect_post_order(&self, id: InstanceId, out: &mut Vec<InstanceId>) {
        let Some(instance) = self.instances.get(id) else { return };
        for &child in instance.children.values() {
            self.collect_post_order(child, out);
        }
        out.push(id);
    }

    /// Keys from the rendered element down to `id` (root excluded).
    pub fn key_path(&self, id: InstanceId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(instance) = self.instances.get(current) else { break };
            if instance.flags.contains(InstanceFlags::ROOT) {
                break;
            }
            path.push(instance.key.clone());
            cursor = instance.parent;
        }
        path.reverse();
        path
    }

    /// Pre-order walk of the subtree under `id`, `id` included.
    pub fn descendants(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(instance) = self.instances.get(current) else { continue };
            out.push(current);
            stack.extend(instance.children.values().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::create_element;
    use crate::error::Result;

    fn noop(_props: &Value) -> Result<Value> {
        Ok(Value::Null)
    }

    fn link(tree: &mut Tree, parent: InstanceId, key: &str) -> InstanceId {
        let id = tree.insert_child(parent, key.to_string(), &create_element(noop, Value::Null));
        if let Some(instance) = tree.get_mut(parent) {
            instance.children.insert(key.to_string(), id);
        }
        id
    }

    #[test]
    fn test_child_depth() {
        let mut tree = Tree::new(Component::new(noop), Value::Null);
        let root = tree.root();
        let child = link(&mut tree, root, "");
        let grandchild = link(&mut tree, child, "a");

        assert_eq!(tree.depth(root), Some(0));
        assert_eq!(tree.depth(child), Some(1));
        assert_eq!(tree.depth(grandchild), Some(2));
        assert_eq!(tree.get(grandchild).and_then(|i| i.parent), Some(child));
    }

    #[test]
    fn test_detach_subtree_post_order() {
        let mut tree = Tree::new(Component::new(noop), Value::Null);
        let root = tree.root();
        let top = link(&mut tree, root, "");
        let a = link(&mut tree, top, "a");
        let a1 = link(&mut tree, a, "a1");
        let b = link(&mut tree, top, "b");

        let detached: Vec<InstanceId> = tree.detach_subtree(a).into_iter().map(|(id, _)| id).collect();
        assert_eq!(detached, vec![a1, a]);
        assert!(!tree.contains(a));
        assert!(!tree.contains(a1));
        assert!(tree.contains(b));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_key_path_and_descendants() {
        let mut tree = Tree::new(Component::new(noop), Value::Null);
        let root = tree.root();
        let top = link(&mut tree, root, "");
        let a = link(&mut tree, top, "a");
        let a1 = link(&mut tree, a, "a1");
        let b = link(&mut tree, top, "b");

        assert_eq!(tree.key_path(a1), vec!["", "a", "a1"]);
        assert_eq!(tree.descendants(top), vec![top, a, a1, b]);
    }
}

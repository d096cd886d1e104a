//! State snapshots.
//!
//! The snapshot is the rendered element's result with every element replaced,
//! recursively, by the snapshot of the child instance it produced. Lists and
//! maps are rebuilt, so the snapshot shares no container storage with the
//! instance tree and later flushes never change it.

use std::collections::HashSet;
use std::rc::Rc;

use crate::engine::{Instance, InstanceId, Segment, Tree, element_key};
use crate::types::{Map, Value};

/// Resolve the whole tree. `Null` before the first flush and after unmount.
pub(crate) fn resolve(tree: &Tree) -> Value {
    resolve_instance(tree, tree.root())
}

fn resolve_instance(tree: &Tree, id: InstanceId) -> Value {
    let Some(instance) = tree.get(id) else {
        return Value::Null;
    };
    resolve_value(tree, instance, &instance.result, &mut Vec::new(), &mut HashSet::new())
}

/// `seen` holds the child keys already resolved for `owner`; a later
/// element with a duplicate key was never instantiated and resolves to `Null`.
fn resolve_value<'a>(
    tree: &Tree,
    owner: &Instance,
    value: &'a Value,
    path: &mut Vec<Segment<'a>>,
    seen: &mut HashSet<String>,
) -> Value {
    match value {
        Value::Element(element) => {
            let key = element_key(element, path);
            if seen.contains(&key) {
                return Value::Null;
            }
            let resolved = owner
                .children
                .get(&key)
                .map_or(Value::Null, |&child| resolve_instance(tree, child));
            seen.insert(key);
            resolved
        }
        Value::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                resolved.push(resolve_value(tree, owner, item, path, seen));
                path.pop();
            }
            Value::List(Rc::new(resolved))
        }
        Value::Map(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (name, item) in map.iter() {
                path.push(Segment::Field(name));
                resolved.insert(name.clone(), resolve_value(tree, owner, item, path, seen));
                path.pop();
            }
            Value::Map(Rc::new(resolved))
        }
        scalar => scalar.clone(),
    }
}

//! Reconciler - executes one instance and syncs its children.
//!
//! After a component returns, every element found in its result (inside lists
//! and maps, but never inside another element's props) is identified by a key
//! and compared with the previous set of children:
//!
//! ```text
//! previous {a, b}      result {b, c}
//!   a  removed   -> subtree torn down, cleanups run leaves first
//!   b  retained  -> props compared shallowly, re-queued if changed
//!   c  added     -> new instance, queued
//! ```
//!
//! A retained key whose element names a different component counts as a
//! removal plus an addition.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::tree::{Instance, InstanceFlags, InstanceId, Tree};
use crate::container::Shared;
use crate::element::Element;
use crate::error::Result;
use crate::hooks::{self, Frame, Hook};
use crate::types::Value;

// =============================================================================
// Child identification
// =============================================================================

/// One step of the path from a component's result to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Index(usize),
    Field(&'a str),
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(index) => write!(f, "{index}"),
            Segment::Field(name) => f.write_str(name),
        }
    }
}

/// Key identifying `element` among its siblings.
///
/// An explicit key wins. An element sitting directly in a list with a `"key"`
/// prop replaces its list index with that key. Otherwise the path itself is
/// the key, segments joined with `.`; an element returned directly has the
/// empty key.
pub(crate) fn element_key(element: &Element, path: &[Segment<'_>]) -> String {
    if let Some(key) = element.key() {
        return key.to_string();
    }
    if let (Some(item), Some((Segment::Index(_), parent))) = (element.item_key(), path.split_last()) {
        return join(parent.iter().map(ToString::to_string).chain([item.to_string()]));
    }
    join(path.iter().map(ToString::to_string))
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(".")
}

/// Elements of a result by key, in traversal order.
///
/// A key seen twice keeps its first element; the later one is ignored.
pub(crate) fn collect_elements(result: &Value) -> IndexMap<String, Element> {
    let mut found = IndexMap::new();
    walk(result, &mut Vec::new(), &mut found);
    found
}

fn walk<'a>(value: &'a Value, path: &mut Vec<Segment<'a>>, found: &mut IndexMap<String, Element>) {
    match value {
        Value::Element(element) => {
            let key = element_key(element, path);
            if found.contains_key(&key) {
                log::warn!(
                    "duplicate child key {key:?} ({}): keys must be unique among siblings, later element ignored",
                    element.component().name()
                );
            } else {
                found.insert(key, element.clone());
            }
        }
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                walk(item, path, found);
                path.pop();
            }
        }
        Value::Map(map) => {
            for (name, item) in map.iter() {
                path.push(Segment::Field(name));
                walk(item, path, found);
                path.pop();
            }
        }
        _ => {}
    }
}

// =============================================================================
// Diffing
// =============================================================================

#[derive(Debug, Default, PartialEq)]
pub(crate) struct KeyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub retained: Vec<String>,
}

pub(crate) fn diff_keys<A, B>(previous: &IndexMap<String, A>, next: &IndexMap<String, B>) -> KeyDiff {
    let mut diff = KeyDiff::default();
    for key in previous.keys() {
        if !next.contains_key(key) {
            diff.removed.push(key.clone());
        }
    }
    for key in next.keys() {
        if previous.contains_key(key) {
            diff.retained.push(key.clone());
        } else {
            diff.added.push(key.clone());
        }
    }
    diff
}

/// Shallow props comparison: same top-level fields holding identical values.
pub(crate) fn props_changed(previous: &Value, next: &Value) -> bool {
    if previous.same(next) {
        return false;
    }
    match (previous, next) {
        (Value::Map(a), Value::Map(b)) => {
            a.len() != b.len()
                || a.iter().any(|(name, value)| b.get(name).is_none_or(|other| !value.same(other)))
        }
        _ => true,
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Execute `id` and reconcile its children.
///
/// On error the instance keeps its previous result and children; the error
/// is returned with the component name attached.
pub(crate) fn reconcile(shared: &Rc<Shared>, id: InstanceId) -> Result<()> {
    let checkout = {
        let mut tree = shared.tree.borrow_mut();
        tree.get_mut(id).map(|instance| {
            instance.flags.insert(InstanceFlags::EXECUTING);
            (
                instance.component.clone(),
                instance.props.clone(),
                std::mem::take(&mut instance.hooks),
                instance.execution_count,
            )
        })
    };
    let Some((component, props, mut hook_records, execution_count)) = checkout else {
        return Ok(());
    };

    let first_run = execution_count == 0;
    if first_run && !hook_records.is_empty() {
        // Partial records of a first execution that failed.
        hooks::release(std::mem::take(&mut hook_records));
    }

    log::trace!("executing `{}` (run {})", component.name(), execution_count + 1);
    let frame = Frame::new(shared.clone(), id, component.name(), hook_records, first_run);
    let (outcome, hook_records) = hooks::execute(frame, || component.render(&props));

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            if let Some(instance) = shared.tree.borrow_mut().get_mut(id) {
                instance.hooks = hook_records;
                instance.flags.remove(InstanceFlags::EXECUTING);
                instance.flags.insert(InstanceFlags::ERRORED);
            }
            log::debug!("`{}` failed: {err}", component.name());
            return Err(err.in_component(component.name()));
        }
    };

    let elements = collect_elements(&result);
    let commit = {
        let mut tree = shared.tree.borrow_mut();
        commit_children(&mut tree, id, hook_records, result, elements)
    };

    hooks::release(commit.orphaned);
    if !commit.detached.is_empty() {
        log::debug!(
            "`{}` removed {} instance(s)",
            component.name(),
            commit.detached.len()
        );
        shared
            .scheduler
            .forget(commit.detached.iter().map(|(detached, _)| *detached));
        for (_, instance) in commit.detached {
            hooks::release(instance.hooks);
        }
    }
    for child in commit.dirtied {
        shared.scheduler.mark_dirty(child);
    }
    Ok(())
}

struct Commit {
    /// Torn-down instances, each after its descendants.
    detached: Vec<(InstanceId, Instance)>,
    dirtied: Vec<InstanceId>,
    /// Records of an instance that vanished during its own execution.
    orphaned: Vec<Hook>,
}

fn commit_children(
    tree: &mut Tree,
    id: InstanceId,
    hook_records: Vec<Hook>,
    result: Value,
    elements: IndexMap<String, Element>,
) -> Commit {
    let mut commit = Commit {
        detached: Vec::new(),
        dirtied: Vec::new(),
        orphaned: Vec::new(),
    };
    let Some(instance) = tree.get_mut(id) else {
        commit.orphaned = hook_records;
        return commit;
    };
    instance.hooks = hook_records;
    instance.result = result;
    instance.execution_count += 1;
    instance
        .flags
        .remove(InstanceFlags::EXECUTING | InstanceFlags::ERRORED);
    let previous = std::mem::take(&mut instance.children);

    let diff = diff_keys(&previous, &elements);
    log::trace!(
        "children: {} added, {} removed, {} retained",
        diff.added.len(),
        diff.removed.len(),
        diff.retained.len()
    );
    for key in &diff.removed {
        if let Some(&child) = previous.get(key) {
            commit.detached.extend(tree.detach_subtree(child));
        }
    }

    let mut children = IndexMap::with_capacity(elements.len());
    for (key, element) in elements {
        let retained = previous.get(&key).copied().filter(|&child| {
            tree.get(child)
                .is_some_and(|existing| existing.component.same(element.component()))
        });

        let child = match retained {
            Some(child) => {
                if let Some(existing) = tree.get_mut(child) {
                    existing.component = element.component().clone();
                    if props_changed(&existing.props, element.props()) {
                        existing.props = element.props().clone();
                        commit.dirtied.push(child);
                    }
                }
                child
            }
            None => {
                if let Some(&replaced) = previous.get(&key) {
                    commit.detached.extend(tree.detach_subtree(replaced));
                }
                let child = tree.insert_child(id, key.clone(), &element);
                commit.dirtied.push(child);
                child
            }
        };
        children.insert(key, child);
    }

    if let Some(instance) = tree.get_mut(id) {
        instance.children = children;
    }
    commit
}

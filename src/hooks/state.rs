//! State hook.
//!
//! ```ignore
//! fn counter(_props: &Value) -> Result<Value> {
//!     let (count, set_count) = use_state(0_i64)?;
//!     use_effect((), move || set_count.set(1))?;
//!     Ok(Value::from(count))
//! }
//! ```
//!
//! The first execution yields the initial value (0), the effect stores 1 and
//! re-queues the instance, and the second execution yields 1. Storing a value
//! equal to the current one does nothing.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::context::{Owner, next_slot};
use super::{Hook, HookKind};
use crate::container::RemoteSetter;
use crate::error::Result;

// =============================================================================
// Records
// =============================================================================

pub(crate) struct StateCell<T> {
    value: RefCell<T>,
    eq: Box<dyn Fn(&T, &T) -> bool>,
}

impl<T> StateCell<T> {
    /// Store `next` unless the comparator calls it equal. Returns whether the
    /// value changed.
    fn replace_if_changed(&self, next: T) -> bool {
        let mut current = self.value.borrow_mut();
        if (self.eq)(&*current, &next) {
            return false;
        }
        *current = next;
        true
    }
}

pub(crate) struct StateRecord {
    cell: Rc<dyn Any>,
    remote: Rc<dyn RemoteApply>,
}

impl StateRecord {
    fn new<T: 'static>(cell: StateCell<T>) -> Self {
        let cell = Rc::new(cell);
        Self {
            remote: cell.clone(),
            cell,
        }
    }

    fn cell<T: 'static>(&self) -> Option<Rc<StateCell<T>>> {
        self.cell.clone().downcast::<StateCell<T>>().ok()
    }

    pub(super) fn remote(&self) -> Rc<dyn RemoteApply> {
        self.remote.clone()
    }
}

// =============================================================================
// Cross-thread updates
// =============================================================================

/// A state change sent from another thread. Values travel type-erased and
/// are checked against the slot when the container applies them.
pub(crate) enum RemoteOp {
    Set(Box<dyn Any + Send>),
    Update(Box<dyn FnOnce(&dyn Any) -> Option<Box<dyn Any + Send>> + Send>),
}

pub(crate) trait RemoteApply {
    /// Apply `op` to the slot. Returns whether the value changed.
    fn apply(&self, op: RemoteOp) -> bool;
}

impl<T: 'static> RemoteApply for StateCell<T> {
    fn apply(&self, op: RemoteOp) -> bool {
        let next = match op {
            RemoteOp::Set(value) => value.downcast::<T>().ok(),
            RemoteOp::Update(update) => {
                let produced = update(&*self.value.borrow() as &dyn Any);
                produced.and_then(|value| value.downcast::<T>().ok())
            }
        };
        match next {
            Some(next) => self.replace_if_changed(*next),
            None => {
                log::warn!("remote update carried a value of the wrong type; ignored");
                false
            }
        }
    }
}

// =============================================================================
// Setter
// =============================================================================

/// Write handle for a state slot.
///
/// Setters are cheap to clone and stay valid for the life of the instance.
/// After the instance is destroyed they still update the orphaned value but
/// no longer schedule anything.
pub struct Setter<T> {
    cell: Rc<StateCell<T>>,
    owner: Owner,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<T: 'static> Setter<T> {
    /// Store `value` and queue the instance if it differs from the current
    /// value.
    pub fn set(&self, value: T) {
        if self.cell.replace_if_changed(value) {
            self.owner.notify();
        }
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&*self.cell.value.borrow());
        self.set(next);
    }

    /// Queue the instance without touching the value.
    pub fn trigger(&self) {
        self.owner.notify();
    }

    /// Current value, including writes not yet rendered.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.value.borrow().clone()
    }

    /// A `Send` handle for updating this slot from other threads.
    pub fn remote(&self) -> RemoteSetter<T>
    where
        T: Send,
    {
        RemoteSetter::new(self.owner.sender(), self.owner.instance, self.owner.slot)
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.owner.instance)
            .field("slot", &self.owner.slot)
            .finish()
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Declare a state slot holding `initial` on first execution.
///
/// Returns the current value and its setter. Writes are compared with
/// `PartialEq`.
pub fn use_state<T>(initial: T) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
{
    use_state_by(move || initial, <T as PartialEq>::eq)
}

/// Like [`use_state`], with the initial value computed only on first
/// execution.
pub fn use_state_with<T>(init: impl FnOnce() -> T) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
{
    use_state_by(init, <T as PartialEq>::eq)
}

/// State slot with a custom equality. A write for which `eq(current, next)`
/// holds is dropped.
pub fn use_state_by<T, E>(init: impl FnOnce() -> T, eq: E) -> Result<(T, Setter<T>)>
where
    T: Clone + 'static,
    E: Fn(&T, &T) -> bool + 'static,
{
    next_slot(
        HookKind::State,
        |_| {
            Hook::State(StateRecord::new(StateCell {
                value: RefCell::new(init()),
                eq: Box::new(eq),
            }))
        },
        |hook, slot| {
            let Hook::State(record) = hook else {
                return Err(slot.type_mismatch(HookKind::State));
            };
            let cell = record
                .cell::<T>()
                .ok_or_else(|| slot.type_mismatch(HookKind::State))?;
            let value = cell.value.borrow().clone();
            Ok((
                value,
                Setter {
                    cell,
                    owner: slot.owner(),
                },
            ))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn cell(value: i64) -> StateCell<i64> {
        StateCell {
            value: RefCell::new(value),
            eq: Box::new(|a: &i64, b: &i64| a == b),
        }
    }

    #[test]
    fn test_replace_if_changed() {
        let cell = cell(1);
        assert!(!cell.replace_if_changed(1));
        assert!(cell.replace_if_changed(2));
        assert_eq!(*cell.value.borrow(), 2);
    }

    #[test]
    fn test_custom_equality() {
        let cell = StateCell {
            value: RefCell::new(String::from("Hello")),
            eq: Box::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b)),
        };
        assert!(!cell.replace_if_changed("HELLO".to_string()));
        assert_eq!(*cell.value.borrow(), "Hello");
    }

    #[test]
    fn test_remote_apply_checks_type() {
        let cell = cell(1);
        assert!(cell.apply(RemoteOp::Set(Box::new(5_i64))));
        assert_eq!(*cell.value.borrow(), 5);

        assert!(!cell.apply(RemoteOp::Set(Box::new("five"))));
        assert_eq!(*cell.value.borrow(), 5);

        let bump = RemoteOp::Update(Box::new(|current: &dyn Any| {
            current
                .downcast_ref::<i64>()
                .map(|n| Box::new(n + 1) as Box<dyn Any + Send>)
        }));
        assert!(cell.apply(bump));
        assert_eq!(*cell.value.borrow(), 6);
    }

    #[test]
    fn test_use_state_outside_render() {
        assert!(matches!(use_state(0_i64), Err(Error::Context)));
    }
}

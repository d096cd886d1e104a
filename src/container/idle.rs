//! Idle listeners.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by [`Container::on_idle`](crate::Container::on_idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct IdleListeners {
    next: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
}

impl IdleListeners {
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    /// Call every listener in registration order. Listeners added or removed
    /// by a callback take effect from the next emission.
    pub fn emit(&self) {
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback();
        }
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

//! Ref hook - a mutable cell that survives re-execution and never schedules
//! work.

use std::cell::RefCell;
use std::rc::Rc;

use super::context::next_slot;
use super::{Hook, HookKind};
use crate::error::Result;

pub fn use_ref<T: 'static>(initial: T) -> Result<Rc<RefCell<T>>> {
    use_ref_with(move || initial)
}

/// Like [`use_ref`], with the initial value computed only on first execution.
pub fn use_ref_with<T: 'static>(init: impl FnOnce() -> T) -> Result<Rc<RefCell<T>>> {
    next_slot(
        HookKind::Ref,
        |_| Hook::Ref(Rc::new(RefCell::new(init()))),
        |hook, slot| {
            let Hook::Ref(cell) = hook else {
                return Err(slot.type_mismatch(HookKind::Ref));
            };
            cell.clone()
                .downcast::<RefCell<T>>()
                .map_err(|_| slot.type_mismatch(HookKind::Ref))
        },
    )
}

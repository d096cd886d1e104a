//! Execution context - the stack of frames hooks resolve against.
//!
//! The reconciler pushes a [`Frame`] before invoking a component and pops it
//! afterwards. While the frame is on top, hook calls claim its slots in call
//! order. The stack is thread-local: containers are single-threaded, and a
//! hook called from any other thread (or outside a render) finds no frame and
//! fails with [`Error::Context`].
//!
//! Frames own the instance's hook records for the duration of the call, so
//! hooks never touch the instance tree and user code never runs while the
//! tree is borrowed.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Sender};

use super::{Hook, HookKind};
use crate::container::{RemoteMessage, Shared};
use crate::engine::InstanceId;
use crate::error::{Error, Result};

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

// =============================================================================
// Frames
// =============================================================================

pub(crate) struct Frame {
    shared: Rc<Shared>,
    instance: InstanceId,
    component: &'static str,
    hooks: Vec<Hook>,
    cursor: usize,
    first_run: bool,
}

impl Frame {
    pub fn new(
        shared: Rc<Shared>,
        instance: InstanceId,
        component: &'static str,
        hooks: Vec<Hook>,
        first_run: bool,
    ) -> Self {
        Self {
            shared,
            instance,
            component,
            hooks,
            cursor: 0,
            first_run,
        }
    }
}

/// Pops the frame if the component unwinds.
struct FrameGuard {
    armed: bool,
}

impl FrameGuard {
    fn finish(mut self) -> Option<Frame> {
        self.armed = false;
        FRAMES.with(|frames| frames.borrow_mut().pop())
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            FRAMES.with(|frames| {
                if let Ok(mut frames) = frames.try_borrow_mut() {
                    frames.pop();
                }
            });
        }
    }
}

/// Run `render` with `frame` as the current context and hand the hook
/// records back.
///
/// A later execution that returns having claimed fewer slots than were
/// recorded fails with [`Error::HookOrder`].
pub(crate) fn execute<R>(frame: Frame, render: impl FnOnce() -> Result<R>) -> (Result<R>, Vec<Hook>) {
    FRAMES.with(|frames| frames.borrow_mut().push(frame));
    let guard = FrameGuard { armed: true };
    let output = render();
    let Some(frame) = guard.finish() else {
        return (Err(Error::Context), Vec::new());
    };

    let output = output.and_then(|value| {
        if !frame.first_run && frame.cursor < frame.hooks.len() {
            return Err(Error::HookOrder {
                component: frame.component,
                slot: frame.cursor,
                requested: None,
                recorded: frame.hooks.get(frame.cursor).map(Hook::kind),
            });
        }
        Ok(value)
    });
    (output, frame.hooks)
}

/// Whether a component is executing on this thread.
pub fn is_rendering() -> bool {
    FRAMES.with(|frames| frames.try_borrow().map(|f| !f.is_empty()).unwrap_or(true))
}

// =============================================================================
// Slots
// =============================================================================

/// What a hook sees of the slot it claimed.
pub(crate) struct Slot<'a> {
    pub shared: &'a Rc<Shared>,
    pub instance: InstanceId,
    pub index: usize,
    pub component: &'static str,
}

impl Slot<'_> {
    pub fn type_mismatch(&self, kind: HookKind) -> Error {
        Error::HookType {
            component: self.component,
            slot: self.index,
            kind,
        }
    }

    pub fn owner(&self) -> Owner {
        Owner {
            shared: Rc::downgrade(self.shared),
            instance: self.instance,
            slot: self.index,
        }
    }
}

/// Claim the next slot of the current frame.
///
/// On the first execution `init` creates the record; afterwards the record
/// at the cursor must be of `kind`. `read` produces the hook's public value.
/// Both run while the frame stack is borrowed: a hook called from inside
/// them fails with [`Error::Context`].
pub(crate) fn next_slot<R>(
    kind: HookKind,
    init: impl FnOnce(&Slot<'_>) -> Hook,
    read: impl FnOnce(&mut Hook, &Slot<'_>) -> Result<R>,
) -> Result<R> {
    FRAMES.with(|frames| {
        let mut frames = frames.try_borrow_mut().map_err(|_| Error::Context)?;
        let frame = frames.last_mut().ok_or(Error::Context)?;
        let slot = Slot {
            shared: &frame.shared,
            instance: frame.instance,
            index: frame.cursor,
            component: frame.component,
        };

        if frame.first_run {
            let hook = init(&slot);
            frame.hooks.push(hook);
        }

        let recorded = frame.hooks.get(slot.index).map(Hook::kind);
        if recorded != Some(kind) {
            return Err(Error::HookOrder {
                component: frame.component,
                slot: slot.index,
                requested: Some(kind),
                recorded,
            });
        }

        let value = read(&mut frame.hooks[slot.index], &slot)?;
        frame.cursor += 1;
        Ok(value)
    })
}

/// Revisit a slot claimed earlier in the same execution.
pub(crate) fn with_slot_at(index: usize, kind: HookKind, update: impl FnOnce(&mut Hook)) -> Result<()> {
    FRAMES.with(|frames| {
        let mut frames = frames.try_borrow_mut().map_err(|_| Error::Context)?;
        let frame = frames.last_mut().ok_or(Error::Context)?;
        let recorded = frame.hooks.get(index).map(Hook::kind);
        if recorded != Some(kind) {
            return Err(Error::HookOrder {
                component: frame.component,
                slot: index,
                requested: Some(kind),
                recorded,
            });
        }
        update(&mut frame.hooks[index]);
        Ok(())
    })
}

// =============================================================================
// Owner
// =============================================================================

/// Back-reference from a hook handle to the slot that created it.
///
/// Holds the container weakly: handles that outlive their container turn
/// into no-ops.
#[derive(Clone)]
pub(crate) struct Owner {
    shared: Weak<Shared>,
    pub instance: InstanceId,
    pub slot: usize,
}

impl Owner {
    /// Mark the owning instance dirty, unless it has been destroyed.
    pub fn notify(&self) {
        let Some(shared) = self.shared.upgrade() else {
            log::debug!("update after container teardown ignored");
            return;
        };
        // While the tree is borrowed, assume alive; passes skip stale ids.
        let alive = shared
            .tree
            .try_borrow()
            .map_or(true, |tree| tree.contains(self.instance));
        if alive {
            shared.scheduler.mark_dirty(self.instance);
        } else {
            log::debug!("update for a destroyed instance ignored");
        }
    }

    /// Channel into the owning container's remote queue. Disconnected when
    /// the container is gone.
    pub fn sender(&self) -> Sender<RemoteMessage> {
        match self.shared.upgrade() {
            Some(shared) => shared.remote.sender(),
            None => mpsc::channel().0,
        }
    }
}

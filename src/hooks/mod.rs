//! Hooks - per-instance state keyed by call position.
//!
//! A component calls hooks in the same order on every execution; the n-th
//! call owns the n-th slot of the instance's record list. The first execution
//! creates the records, every later one must match them kind for kind.
//!
//! - [`use_state`] and friends: a value plus a [`Setter`] that re-queues the
//!   instance on change.
//! - [`use_effect`]: a body re-run when its dependency value changes, with an
//!   optional [`Cleanup`].
//! - [`use_ref`]: a mutable cell that never triggers work.
//! - [`use_singleton`], [`use_named_singleton`], [`use_environment`]: values
//!   shared by every instance of one container.

mod context;
mod effect;
mod refs;
mod singleton;
mod state;

use std::fmt;
use std::rc::Rc;

pub use context::is_rendering;
pub use effect::{Cleanup, EffectOutcome, cleanup, use_effect};
pub use refs::{use_ref, use_ref_with};
pub use singleton::{Singleton, use_environment, use_named_singleton, use_singleton};
pub use state::{Setter, use_state, use_state_by, use_state_with};

pub(crate) use context::{Frame, execute};
pub(crate) use singleton::{SingletonKey, SingletonRegistry, resolve_singleton};
pub(crate) use state::{RemoteApply, RemoteOp};

use effect::EffectRecord;
use state::StateRecord;

/// The kind of record a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    State,
    Effect,
    Ref,
    Singleton,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::State => "state",
            HookKind::Effect => "effect",
            HookKind::Ref => "ref",
            HookKind::Singleton => "singleton",
        })
    }
}

pub(crate) enum Hook {
    State(StateRecord),
    Effect(EffectRecord),
    Ref(Rc<dyn std::any::Any>),
    Singleton(SingletonKey),
}

impl Hook {
    pub fn kind(&self) -> HookKind {
        match self {
            Hook::State(_) => HookKind::State,
            Hook::Effect(_) => HookKind::Effect,
            Hook::Ref(_) => HookKind::Ref,
            Hook::Singleton(_) => HookKind::Singleton,
        }
    }

    /// Receiver for cross-thread updates, if this is a state slot.
    pub(crate) fn remote_target(&self) -> Option<Rc<dyn RemoteApply>> {
        match self {
            Hook::State(record) => Some(record.remote()),
            _ => None,
        }
    }
}

/// Run the pending effect cleanups of a discarded record list, in slot order.
pub(crate) fn release(hooks: Vec<Hook>) {
    for hook in hooks {
        if let Hook::Effect(record) = hook {
            record.release();
        }
    }
}

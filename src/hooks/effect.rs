//! Effect hook.
//!
//! The body runs at the call site, during the component's execution, on the
//! first execution and on every execution where the dependency value differs
//! from the one recorded last time. A cleanup returned by the previous run is
//! called right before the body re-runs, and once more when the instance is
//! destroyed.
//!
//! Dependencies are any `PartialEq` value; tuples cover the multi-dependency
//! case and `()` means "once".

use std::any::Any;

use super::context::{next_slot, with_slot_at};
use super::{Hook, HookKind};
use crate::error::Result;

/// Teardown registered by an effect body.
pub type Cleanup = Box<dyn FnOnce()>;

/// Box a closure as a [`Cleanup`].
pub fn cleanup(f: impl FnOnce() + 'static) -> Cleanup {
    Box::new(f)
}

/// What an effect body may return.
pub trait EffectOutcome {
    fn into_cleanup(self) -> Result<Option<Cleanup>>;
}

impl EffectOutcome for () {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(None)
    }
}

impl EffectOutcome for Cleanup {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(Some(self))
    }
}

impl EffectOutcome for Option<Cleanup> {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(self)
    }
}

impl<T: EffectOutcome> EffectOutcome for Result<T> {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        self?.into_cleanup()
    }
}

#[derive(Default)]
pub(crate) struct EffectRecord {
    deps: Option<Box<dyn Any>>,
    cleanup: Option<Cleanup>,
}

impl EffectRecord {
    pub fn release(self) {
        if let Some(cleanup) = self.cleanup {
            cleanup();
        }
    }
}

/// Run `body` now if `deps` changed since the last execution.
///
/// An error returned by the body aborts the component's execution. The
/// previous cleanup has already run at that point and the old dependency
/// value stays recorded, so the body is retried on the next execution.
pub fn use_effect<D, F, R>(deps: D, body: F) -> Result<()>
where
    D: PartialEq + 'static,
    F: FnOnce() -> R,
    R: EffectOutcome,
{
    let pending = next_slot(
        HookKind::Effect,
        |_| Hook::Effect(EffectRecord::default()),
        |hook, slot| {
            let Hook::Effect(record) = hook else {
                return Err(slot.type_mismatch(HookKind::Effect));
            };
            let unchanged = record
                .deps
                .as_ref()
                .and_then(|previous| previous.downcast_ref::<D>())
                .is_some_and(|previous| *previous == deps);
            if unchanged {
                return Ok(None);
            }
            Ok(Some((slot.index, record.cleanup.take())))
        },
    )?;

    let Some((index, previous)) = pending else {
        return Ok(());
    };
    if let Some(previous) = previous {
        previous();
    }
    let cleanup = body().into_cleanup()?;

    with_slot_at(index, HookKind::Effect, move |hook| {
        if let Hook::Effect(record) = hook {
            record.deps = Some(Box::new(deps));
            record.cleanup = cleanup;
        }
    })
}

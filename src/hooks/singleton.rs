//! Singleton hooks - one value per identity per container.
//!
//! Every instance that asks for the same identity within one container gets
//! the same `Rc`. The factory runs once, on the first request; the value lives
//! until the container is unmounted. Two identities exist:
//!
//! - a [`Singleton`] token, usually a `static`, identified by the token itself;
//! - a name, via [`use_named_singleton`].
//!
//! The slot remembers the identity it resolved on first execution, so a later
//! execution passing a different token or name still gets the first value.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::next_slot;
use super::{Hook, HookKind};
use crate::container::Shared;
use crate::error::{Error, Result};
use crate::options::Environment;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity token for an anonymous singleton.
///
/// ```ignore
/// static CONNECTIONS: Singleton<Pool> = Singleton::new(Pool::default);
///
/// fn reader(_props: &Value) -> Result<Value> {
///     let pool = use_singleton(&CONNECTIONS)?;
///     ...
/// }
/// ```
pub struct Singleton<T: 'static> {
    id: OnceLock<u64>,
    factory: fn() -> T,
}

impl<T: 'static> Singleton<T> {
    pub const fn new(factory: fn() -> T) -> Self {
        Self {
            id: OnceLock::new(),
            factory,
        }
    }

    fn id(&self) -> u64 {
        *self.id.get_or_init(|| NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn key(&self) -> SingletonKey {
        SingletonKey::Anonymous(self.id())
    }

    pub(crate) fn create(&self) -> T {
        (self.factory)()
    }
}

/// Clones share the identity of the original.
impl<T: 'static> Clone for Singleton<T> {
    fn clone(&self) -> Self {
        Self {
            id: OnceLock::from(self.id()),
            factory: self.factory,
        }
    }
}

impl<T: 'static> fmt::Debug for Singleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Singleton")
            .field("id", &self.id.get())
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SingletonKey {
    Anonymous(u64),
    Named(Rc<str>),
    Environment,
}

impl fmt::Display for SingletonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingletonKey::Anonymous(id) => write!(f, "#{id}"),
            SingletonKey::Named(name) => f.write_str(name),
            SingletonKey::Environment => f.write_str("environment"),
        }
    }
}

#[derive(Default)]
pub(crate) struct SingletonRegistry {
    values: HashMap<SingletonKey, Rc<dyn Any>>,
}

impl SingletonRegistry {
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Look `key` up, creating the value with `factory` on a miss.
///
/// The factory runs without the registry borrowed, so it may itself resolve
/// other singletons.
pub(crate) fn resolve_singleton<T: 'static>(
    registry: &RefCell<SingletonRegistry>,
    key: &SingletonKey,
    factory: impl FnOnce() -> T,
) -> Result<Rc<T>> {
    let existing = registry.borrow().values.get(key).cloned();
    let value = match existing {
        Some(value) => value,
        None => {
            let created: Rc<dyn Any> = Rc::new(factory());
            log::debug!("created singleton `{key}`");
            registry
                .borrow_mut()
                .values
                .entry(key.clone())
                .or_insert(created)
                .clone()
        }
    };
    value
        .downcast::<T>()
        .map_err(|_| Error::SingletonType { name: key.to_string() })
}

// =============================================================================
// Hooks
// =============================================================================

/// Claim a singleton slot, recording `key` on first execution. Returns the
/// container and the recorded identity.
fn bind(key: SingletonKey) -> Result<(Rc<Shared>, SingletonKey)> {
    next_slot(
        HookKind::Singleton,
        |_| Hook::Singleton(key),
        |hook, slot| match hook {
            Hook::Singleton(recorded) => Ok((slot.shared.clone(), recorded.clone())),
            _ => Err(slot.type_mismatch(HookKind::Singleton)),
        },
    )
}

/// Container-wide value identified by `singleton`.
pub fn use_singleton<T: 'static>(singleton: &Singleton<T>) -> Result<Rc<T>> {
    let (shared, key) = bind(singleton.key())?;
    resolve_singleton(&shared.singletons, &key, || singleton.create())
}

/// Container-wide value identified by `name`. `factory` only runs if no
/// value exists for the name yet.
pub fn use_named_singleton<T: 'static>(name: &str, factory: impl FnOnce() -> T) -> Result<Rc<T>> {
    let (shared, key) = bind(SingletonKey::Named(name.into()))?;
    resolve_singleton(&shared.singletons, &key, factory)
}

/// The container's [`Environment`].
pub fn use_environment() -> Result<Environment> {
    let (shared, key) = bind(SingletonKey::Environment)?;
    let mode = shared.options.mode;
    let environment = resolve_singleton(&shared.singletons, &key, || Environment { mode })?;
    Ok(*environment)
}

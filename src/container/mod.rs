//! Container - owns one rendered tree and drives its work.
//!
//! [`render`] wraps the root element in a synthetic root instance and queues
//! it; nothing executes until the host drives the container:
//!
//! ```ignore
//! let container = render(create_element(app, Value::Null), RenderOptions::default());
//! container.on_idle(|| println!("settled"));
//! container.run_until_idle()?;
//! println!("{}", container.state());
//! ```
//!
//! Everything the container owns (instances, dirty set, singletons, idle
//! listeners) is confined to the thread that created it. Other threads reach
//! it only through [`RemoteHandle`] and [`RemoteSetter`].

mod idle;
mod remote;
mod snapshot;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use idle::ListenerId;
pub use remote::{RemoteHandle, RemoteSetter};
pub(crate) use remote::RemoteMessage;

use idle::IdleListeners;
use remote::RemoteQueue;

use crate::element::{Component, Element};
use crate::engine::{InstanceFlags, InstanceId, Scheduler, Tree, reconcile};
use crate::error::{Error, Result};
use crate::hooks::{self, RemoteApply, Singleton, SingletonKey, SingletonRegistry, resolve_singleton};
use crate::options::{Mode, RenderOptions};
use crate::types::Value;

/// State shared between a container and the hooks of its instances.
pub(crate) struct Shared {
    pub tree: RefCell<Tree>,
    pub scheduler: Scheduler,
    pub singletons: RefCell<SingletonRegistry>,
    pub options: RenderOptions,
    pub remote: RemoteQueue,
    idle: IdleListeners,
    /// A pass ran since the last idle notification.
    draining: Cell<bool>,
    stopped: Cell<bool>,
}

impl Shared {
    /// Detach every instance, run their cleanups leaves first, then drop the
    /// singletons. Idempotent.
    fn teardown(&self) {
        let detached = {
            let Ok(mut tree) = self.tree.try_borrow_mut() else {
                log::warn!("container dropped while its tree was borrowed; cleanups skipped");
                return;
            };
            let root = tree.root();
            tree.detach_subtree(root)
        };
        if detached.is_empty() {
            return;
        }
        log::debug!("unmounting {} instance(s)", detached.len());
        self.scheduler
            .forget(detached.iter().map(|(id, _)| *id));
        for (_, instance) in detached {
            hooks::release(instance.hooks);
        }
        self.idle.clear();
        let singletons = self.singletons.take();
        if singletons.len() > 0 {
            log::debug!("dropping {} singleton(s)", singletons.len());
        }
        drop(singletons);
    }
}

/// The synthetic root: renders whatever element it was given.
fn root(props: &Value) -> Result<Value> {
    Ok(props["child"].clone())
}

/// Create a container for `element`.
///
/// The root is queued but not executed; call [`Container::run_until_idle`],
/// [`Container::flush`] or [`Container::run`].
pub fn render(element: Element, options: RenderOptions) -> Container {
    let props = Value::map([("child", element)]);
    let tree = Tree::new(Component::new(root), props);
    let root_id = tree.root();
    let shared = Rc::new(Shared {
        tree: RefCell::new(tree),
        scheduler: Scheduler::new(),
        singletons: RefCell::new(SingletonRegistry::default()),
        options,
        remote: RemoteQueue::new(),
        idle: IdleListeners::default(),
        draining: Cell::new(false),
        stopped: Cell::new(false),
    });
    shared.scheduler.mark_dirty(root_id);
    log::debug!("container created ({:?} mode)", shared.options.mode);
    Container { shared }
}

/// Diagnostic view of one instance, from [`Container::inspect`].
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub id: InstanceId,
    /// Keys from the rendered element down to this instance.
    pub path: Vec<String>,
    pub component: &'static str,
    pub depth: usize,
    pub execution_count: u64,
    pub hook_count: usize,
    pub dirty: bool,
    pub errored: bool,
}

/// Handle to a rendered tree.
///
/// Dropping the container unmounts it.
pub struct Container {
    shared: Rc<Shared>,
}

impl Container {
    // =========================================================================
    // Driving work
    // =========================================================================

    /// Run a single pass over the instances dirty right now.
    ///
    /// Returns whether work remains for another pass. Idle fires when this
    /// pass leaves nothing behind. Called from inside a running drain it does
    /// nothing.
    pub fn flush(&self) -> Result<bool> {
        let Some(_guard) = self.shared.scheduler.enter() else {
            return Ok(self.shared.scheduler.has_work());
        };
        self.pump_remote();
        if self.shared.scheduler.has_work() {
            self.pass()?;
        }
        self.settle();
        Ok(self.shared.scheduler.has_work())
    }

    /// Repeat passes until nothing is dirty, then fire idle once.
    ///
    /// Work queued by an idle listener starts another drain, and idle fires
    /// again once that one settles. Stops at the first component error,
    /// leaving the remaining work queued.
    pub fn run_until_idle(&self) -> Result<()> {
        let Some(_guard) = self.shared.scheduler.enter() else {
            return Ok(());
        };
        self.pump_remote();
        let mut passes = 0;
        while self.shared.scheduler.has_work() {
            while self.shared.scheduler.has_work() {
                if self.shared.options.max_passes.is_some_and(|max| passes >= max) {
                    log::warn!("giving up after {passes} flush passes");
                    return Err(Error::FlushLimit { passes });
                }
                self.pass()?;
                passes += 1;
                self.pump_remote();
            }
            self.settle();
        }
        Ok(())
    }

    /// Drain, and in [`Mode::Continuous`] keep applying remote updates until
    /// [`RemoteHandle::stop`] is called.
    pub fn run(&self) -> Result<()> {
        let outcome = self.run_loop();
        self.shared.stopped.set(false);
        outcome
    }

    fn run_loop(&self) -> Result<()> {
        self.run_until_idle()?;
        if self.shared.options.mode == Mode::Single {
            return Ok(());
        }
        while !self.shared.stopped.get() {
            // Never block with dirty instances queued.
            if self.shared.scheduler.has_work() {
                self.run_until_idle()?;
            }
            let Some(message) = self.shared.remote.recv() else {
                break;
            };
            self.apply_remote(message);
            if !self.shared.stopped.get() {
                self.run_until_idle()?;
            }
        }
        log::debug!("continuous run stopped");
        Ok(())
    }

    fn pass(&self) -> Result<()> {
        let batch = self.shared.scheduler.begin_pass(&self.shared.tree.borrow());
        if batch.is_empty() {
            return Ok(());
        }
        self.shared.draining.set(true);
        log::debug!("flush pass over {} instance(s)", batch.len());
        for id in batch {
            if self.shared.scheduler.take(id) {
                reconcile(&self.shared, id)?;
            }
        }
        Ok(())
    }

    /// Fire idle if a drain just completed.
    fn settle(&self) {
        if self.shared.scheduler.has_work() || !self.shared.draining.replace(false) {
            return;
        }
        log::debug!("container idle");
        self.shared.idle.emit();
    }

    fn pump_remote(&self) {
        while let Some(message) = self.shared.remote.try_recv() {
            self.apply_remote(message);
        }
    }

    fn apply_remote(&self, message: RemoteMessage) {
        match message {
            RemoteMessage::Update { instance, slot, op } => {
                let target = self
                    .shared
                    .tree
                    .borrow()
                    .get(instance)
                    .and_then(|found| found.hooks.get(slot))
                    .and_then(|hook| hook.remote_target());
                match target {
                    Some(target) => {
                        if target.apply(op) {
                            self.shared.scheduler.mark_dirty(instance);
                        }
                    }
                    None => log::warn!("remote update for an instance that no longer exists ignored"),
                }
            }
            RemoteMessage::Trigger { instance } => {
                if self.shared.tree.borrow().contains(instance) {
                    self.shared.scheduler.mark_dirty(instance);
                } else {
                    log::warn!("remote trigger for an instance that no longer exists ignored");
                }
            }
            RemoteMessage::Wake => {}
            RemoteMessage::Stop => self.shared.stopped.set(true),
        }
    }

    // =========================================================================
    // Observing
    // =========================================================================

    /// Snapshot of the tree's merged result.
    pub fn state(&self) -> Value {
        snapshot::resolve(&self.shared.tree.borrow())
    }

    /// Call `callback` every time the dirty set is fully drained.
    pub fn on_idle(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.shared.idle.subscribe(callback)
    }

    /// Remove an idle listener. Returns whether it was registered.
    pub fn off_idle(&self, id: ListenerId) -> bool {
        self.shared.idle.unsubscribe(id)
    }

    pub fn has_pending_work(&self) -> bool {
        self.shared.scheduler.has_work()
    }

    /// Whether an update arrived since the last pass started.
    pub fn is_flush_scheduled(&self) -> bool {
        self.shared.scheduler.is_scheduled()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.shared.options
    }

    /// Number of live instances, the synthetic root excluded.
    pub fn instance_count(&self) -> usize {
        self.shared.tree.borrow().len().saturating_sub(1)
    }

    /// Every live instance in pre-order, the synthetic root excluded.
    pub fn inspect(&self) -> Vec<InstanceInfo> {
        let tree = self.shared.tree.borrow();
        let root = tree.root();
        tree.descendants(root)
            .into_iter()
            .filter_map(|id| {
                let instance = tree.get(id)?;
                if instance.flags.contains(InstanceFlags::ROOT) {
                    return None;
                }
                Some(InstanceInfo {
                    id,
                    path: tree.key_path(id),
                    component: instance.component.name(),
                    depth: instance.depth,
                    execution_count: instance.execution_count,
                    hook_count: instance.hooks.len(),
                    dirty: self.shared.scheduler.is_dirty(id),
                    errored: instance.flags.contains(InstanceFlags::ERRORED),
                })
            })
            .collect()
    }

    // =========================================================================
    // Singletons and remote control
    // =========================================================================

    /// The container's value for `singleton`, created on first request.
    pub fn singleton<T: 'static>(&self, singleton: &Singleton<T>) -> Result<Rc<T>> {
        resolve_singleton(&self.shared.singletons, &singleton.key(), || singleton.create())
    }

    /// The container's value for `name`, created with `factory` on first
    /// request.
    pub fn named_singleton<T: 'static>(&self, name: &str, factory: impl FnOnce() -> T) -> Result<Rc<T>> {
        resolve_singleton(&self.shared.singletons, &SingletonKey::Named(name.into()), factory)
    }

    /// A `Send` handle for stopping or waking [`Container::run`].
    pub fn remote(&self) -> RemoteHandle {
        RemoteHandle::new(self.shared.remote.sender())
    }

    /// Tear the tree down, running every pending effect cleanup.
    pub fn unmount(self) {
        self.shared.teardown();
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

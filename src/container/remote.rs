//! Remote handles - feeding a container from other threads.
//!
//! A container is single-threaded, but the things that drive a long-running
//! one (file watchers, timers, sockets) usually are not. Handles here only
//! send messages down the container's channel; the container applies them on
//! its own thread, at the start of every drain and while
//! [`Container::run`](crate::Container::run) waits in continuous mode.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::engine::InstanceId;
use crate::hooks::RemoteOp;

pub(crate) enum RemoteMessage {
    Update {
        instance: InstanceId,
        slot: usize,
        op: RemoteOp,
    },
    Trigger {
        instance: InstanceId,
    },
    Wake,
    Stop,
}

pub(crate) struct RemoteQueue {
    tx: Sender<RemoteMessage>,
    rx: Receiver<RemoteMessage>,
}

impl RemoteQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<RemoteMessage> {
        self.tx.clone()
    }

    pub fn try_recv(&self) -> Option<RemoteMessage> {
        self.rx.try_recv().ok()
    }

    /// Block until a message arrives. The queue holds a sender itself, so
    /// this only returns `None` if that invariant is broken.
    pub fn recv(&self) -> Option<RemoteMessage> {
        self.rx.recv().ok()
    }
}

/// `Send` handle controlling a running container.
#[derive(Clone)]
pub struct RemoteHandle {
    tx: Sender<RemoteMessage>,
}

impl RemoteHandle {
    pub(crate) fn new(tx: Sender<RemoteMessage>) -> Self {
        Self { tx }
    }

    /// Ask [`Container::run`](crate::Container::run) to return after the
    /// current drain. Returns `false` if the container is gone.
    pub fn stop(&self) -> bool {
        self.tx.send(RemoteMessage::Stop).is_ok()
    }

    /// Make a waiting container drain its pending work.
    pub fn wake(&self) -> bool {
        self.tx.send(RemoteMessage::Wake).is_ok()
    }
}

/// `Send` counterpart of [`Setter`](crate::Setter).
///
/// Writes are queued and applied by the container thread with the same
/// equality rule as local writes. Every method returns `false` once the
/// container is gone.
pub struct RemoteSetter<T> {
    tx: Sender<RemoteMessage>,
    instance: InstanceId,
    slot: usize,
    _value: PhantomData<fn(T)>,
}

impl<T> Clone for RemoteSetter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            instance: self.instance,
            slot: self.slot,
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> RemoteSetter<T> {
    pub(crate) fn new(tx: Sender<RemoteMessage>, instance: InstanceId, slot: usize) -> Self {
        Self {
            tx,
            instance,
            slot,
            _value: PhantomData,
        }
    }

    pub fn set(&self, value: T) -> bool {
        self.send(RemoteOp::Set(Box::new(value)))
    }

    /// Compute the next value from the current one, on the container thread.
    pub fn update(&self, f: impl FnOnce(&T) -> T + Send + 'static) -> bool {
        self.send(RemoteOp::Update(Box::new(move |current: &dyn Any| {
            current
                .downcast_ref::<T>()
                .map(|current| Box::new(f(current)) as Box<dyn Any + Send>)
        })))
    }

    /// Queue the instance without touching the value.
    pub fn trigger(&self) -> bool {
        self.tx
            .send(RemoteMessage::Trigger {
                instance: self.instance,
            })
            .is_ok()
    }

    fn send(&self, op: RemoteOp) -> bool {
        self.tx
            .send(RemoteMessage::Update {
                instance: self.instance,
                slot: self.slot,
                op,
            })
            .is_ok()
    }
}

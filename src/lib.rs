//! # spark-reconciler
//!
//! Hook-based reactive reconciliation for arbitrary data trees.
//!
//! Components are plain functions from props to a [`Value`]. Wherever a result
//! holds an [`Element`], the engine keeps a persistent child instance; state
//! and effects declared through hooks survive between executions, and a state
//! change re-executes only the instances that depend on it.
//!
//! ## Architecture
//!
//! ```text
//! render(element) -> Container
//!                       │ run_until_idle / flush / run
//!                       ▼
//!     Scheduler (dirty set, depth order) ──► Reconciler ──► component fn
//!            ▲                                   │             │ hooks
//!            └──── Setter::set / new children ◄──┘      hook slots on the Instance
//! ```
//!
//! The merged result of the whole tree is available as [`Container::state`],
//! with every element replaced by its instance's own state.
//!
//! ## Modules
//!
//! - [`types`] - The closed [`Value`] model
//! - [`element`] - Elements, components, the [`Render`] capability
//! - [`hooks`] - State, effect, ref and singleton hooks
//! - [`engine`] - Instance tree, scheduler, reconciler
//! - [`container`] - Rendering entry point, snapshots, idle, remote control
//! - [`options`] - Render configuration
//! - [`error`] - Error type

pub mod container;
pub mod element;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod options;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use container::{
    Container, InstanceInfo, ListenerId, RemoteHandle, RemoteSetter, render,
};

pub use element::{Component, Element, Render, create_element};

pub use engine::{InstanceFlags, InstanceId};

pub use error::{Error, Result};

pub use hooks::{
    // State
    Setter, use_state, use_state_by, use_state_with,
    // Effects
    Cleanup, EffectOutcome, cleanup, use_effect,
    // Refs
    use_ref, use_ref_with,
    // Singletons
    Singleton, use_environment, use_named_singleton, use_singleton,
    // Introspection
    HookKind, is_rendering,
};

pub use options::{Environment, Mode, RenderOptions};

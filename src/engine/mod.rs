//! Engine - instance tree, scheduling, and reconciliation.
//!
//! The engine manages the core data structures:
//! - Tree: slot arena of instances, hierarchical ownership through keyed
//!   children maps
//! - Scheduler: the dirty set and depth-ordered pass planning
//! - Reconciler: one instance's execution plus the keyed diff of its children
//!
//! # Architecture
//!
//! Components are plain functions. What persists between executions lives in
//! the instance created for them:
//!
//! ```text
//! InstanceId(1v1): root     (depth 0, children {"": 2v1})
//! InstanceId(2v1): app      (depth 1, hooks [State, Effect], children {"items.a": 3v1})
//! InstanceId(3v1): item     (depth 2, props {key: "a"})
//! ```
//!
//! A flush walks the dirty set shallowest-first, so a parent always settles
//! its children's props before they execute.

mod reconciler;
mod scheduler;
mod tree;

pub(crate) use reconciler::{Segment, element_key, reconcile};
pub(crate) use scheduler::Scheduler;
pub use tree::{InstanceFlags, InstanceId};
pub(crate) use tree::{Instance, Tree};

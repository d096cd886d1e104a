//! Error types.
//!
//! Nothing here is retried or recovered by the engine. Every error surfaces
//! synchronously to whoever drove the flush.

use crate::hooks::HookKind;

/// Engine error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A hook was called while no component was executing.
    #[error("hooks can only be called while a component is executing")]
    Context,

    /// The hook requested at a slot does not match the hook recorded there.
    ///
    /// `requested` is `None` when the component returned having called fewer
    /// hooks than on its first execution; `recorded` is `None` when it called
    /// more.
    #[error(
        "hook order changed in `{component}`: slot {slot} was {} but is now {}",
        describe(.recorded),
        describe(.requested)
    )]
    HookOrder {
        component: &'static str,
        slot: usize,
        requested: Option<HookKind>,
        recorded: Option<HookKind>,
    },

    /// Same hook kind at the slot, but a different value type.
    #[error("{kind} hook at slot {slot} of `{component}` changed its value type")]
    HookType {
        component: &'static str,
        slot: usize,
        kind: HookKind,
    },

    /// A singleton identity already holds a value of another type.
    #[error("singleton `{name}` already holds a value of a different type")]
    SingletonType { name: String },

    /// A component (or one of its effects) failed.
    #[error("component `{component}` failed: {source}")]
    Component {
        component: &'static str,
        #[source]
        source: Box<dyn std::error::Error>,
    },

    /// Draining did not settle within the configured number of passes.
    #[error("work did not settle after {passes} flush passes")]
    FlushLimit { passes: usize },

    /// Error raised by user code.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error>),
}

fn describe(kind: &Option<HookKind>) -> String {
    match kind {
        Some(kind) => format!("`{kind}`"),
        None => "missing".to_string(),
    }
}

impl Error {
    /// Wrap any error (or message) raised by component or effect code.
    pub fn custom(error: impl Into<Box<dyn std::error::Error>>) -> Self {
        Error::Custom(error.into())
    }

    /// Attribute a user error to the component it escaped from.
    pub(crate) fn in_component(self, component: &'static str) -> Self {
        match self {
            Error::Custom(source) => Error::Component { component, source },
            other => other,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Render configuration.

/// How long a container keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drain the initial work and return. Suited to one-shot pipelines.
    #[default]
    Single,
    /// Keep waiting for remote updates (watchers, timers) after each drain
    /// until stopped.
    Continuous,
}

/// Options passed to [`render`](crate::render).
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub mode: Mode,
    /// Upper bound on flush passes per drain. `None` means unbounded.
    pub max_passes: Option<usize>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = Some(passes);
        self
    }
}

/// What a component can learn about the container running it.
///
/// See [`use_environment`](crate::use_environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub mode: Mode,
}

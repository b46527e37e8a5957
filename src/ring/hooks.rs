//! Injected logging hooks

use std::fmt;
use std::sync::Arc;

/// Logging callback taking pre-formatted arguments
pub type LogFn = Arc<dyn Fn(fmt::Arguments<'_>) + Send + Sync>;

/// Trace and error sinks of one ring.
///
/// Without custom hooks everything goes to `tracing` under the ring's name.
#[derive(Clone)]
pub(crate) struct RingLog {
    name: Arc<str>,
    trace: Option<LogFn>,
    error: Option<LogFn>,
}

impl RingLog {
    pub(crate) fn new(name: &str, trace: Option<LogFn>, error: Option<LogFn>) -> Self {
        Self {
            name: Arc::from(name),
            trace,
            error,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn trace(&self, args: fmt::Arguments<'_>) {
        match &self.trace {
            Some(f) => f(args),
            None => tracing::trace!(ring = %self.name, "{}", args),
        }
    }

    pub(crate) fn error(&self, args: fmt::Arguments<'_>) {
        match &self.error {
            Some(f) => f(args),
            None => tracing::error!(ring = %self.name, "{}", args),
        }
    }
}

//! Error types for graph traversal.

use std::fmt;
use std::panic::Location;

use crate::flow::FactoryId;

/// Call site attached to traversal errors.
///
/// Captured with `#[track_caller]`, so an [`IncompleteFlow`] raised deep in a
/// recursive refresh still blames the caller that issued the request.
///
/// [`IncompleteFlow`]: FlowError::IncompleteFlow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    file: &'static str,
    line: u32,
    column: u32,
}

impl Locator {
    /// Capture the current caller.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }

    /// Source file of the blamed call site.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Line of the blamed call site.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Errors surfaced by `make`, `tasklist` and `targets`.
///
/// All errors propagate to the immediate caller; nothing is retried, logged
/// or swallowed internally.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// One or more required input traits have no product assigned.
    ///
    /// Never retried automatically: bind the missing inputs and re-issue the
    /// whole call.
    #[error("incomplete flow: factory '{name}' has unbound inputs {unbound:?} (requested at {locator})")]
    IncompleteFlow {
        /// The factory whose inputs are incomplete.
        factory: FactoryId,
        /// Its display name.
        name: String,
        /// The unbound trait names, in declared order.
        unbound: Vec<String>,
        /// The call site that issued the request.
        locator: Locator,
    },

    /// The traversal ran into a dependency cycle.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle {
        /// Factory names along the cycle, the repeated factory first and last.
        path: Vec<String>,
    },

    /// A trait was rebound on a factory that never declared it.
    #[error("factory '{factory}' declares no trait named '{trait_name}'")]
    UnknownTrait {
        /// The factory's display name.
        factory: String,
        /// The undeclared trait.
        trait_name: String,
    },

    /// The factory's own computation failed.
    ///
    /// Upstream products already marked fresh stay fresh; there is no
    /// rollback.
    #[error("factory '{name}' failed to remake its products")]
    Task {
        /// The display name of the failing factory.
        name: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },
}

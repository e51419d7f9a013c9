//! Failure taxonomy for the dispatch core.
//!
//! Every fallible operation in the crate returns [`DispatchError`]. The
//! dispatcher's exception phase is the single place errors are classified
//! into terminal responses; the trie, the registry, and the plugin pipeline
//! only ever construct and propagate these values.

use http::Method;
use thiserror::Error;

use crate::dispatcher::DispatchPhase;

/// Errors raised while building the routing table or processing a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Trie resolution visited no node carrying a handler.
    #[error("no resource is mapped to '{path}'")]
    ResourceNotFound {
        /// The request path that failed to resolve.
        path: String,
    },

    /// The resolved resource does not implement the requested operation.
    #[error("{method} is not allowed for this resource")]
    MethodNotAllowed {
        /// The method the request asked for.
        method: Method,
        /// The operations the resource declares support for.
        allowed: Vec<Method>,
    },

    /// A second handler was registered under an already-mapped route.
    /// Registration never overwrites.
    #[error("route '{route}' already has a handler registered")]
    RouteConflict {
        /// The conflicting route pattern.
        route: String,
    },

    /// An operation was attempted in a phase that does not permit it.
    #[error("{message} (current phase: {phase})")]
    InvalidState {
        /// The phase the dispatcher was in when the operation was attempted.
        phase: DispatchPhase,
        /// What was attempted.
        message: String,
    },

    /// `run()` was re-entered while a run was already active.
    #[error("dispatch is already running")]
    AlreadyRunning,

    /// Any other failure; classified as a generic server error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DispatchError {
    pub fn resource_not_found(path: impl Into<String>) -> Self {
        Self::ResourceNotFound { path: path.into() }
    }

    pub fn method_not_allowed(method: Method, allowed: Vec<Method>) -> Self {
        Self::MethodNotAllowed { method, allowed }
    }

    pub fn route_conflict(route: impl Into<String>) -> Self {
        Self::RouteConflict {
            route: route.into(),
        }
    }

    pub fn invalid_state(phase: DispatchPhase, message: impl Into<String>) -> Self {
        Self::InvalidState {
            phase,
            message: message.into(),
        }
    }

    /// Programmer/integration errors that must surface to the host instead of
    /// being converted into a user-facing response.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RouteConflict { .. } | Self::InvalidState { .. } | Self::AlreadyRunning
        )
    }

    /// The status code the exception phase classifies this error as, or
    /// `None` for fatal kinds that are re-raised instead.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ResourceNotFound { .. } => Some(404),
            Self::MethodNotAllowed { .. } => Some(405),
            Self::Other(_) => Some(500),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(error: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(error))
    }
}

//! Environment-driven dispatch configuration.
//!
//! Loads behavior toggles from `SWITCHYARD_*` environment variables with
//! code-level defaults, in the same spirit as a container deployment where
//! the process environment is the configuration surface.
//!
//! | Variable                   | Default     | Meaning                                  |
//! |----------------------------|-------------|------------------------------------------|
//! | `SWITCHYARD_CONTENT_TYPE`  | `text/html` | Content type merged in at the Output phase when the response has none |
//! | `SWITCHYARD_CHARSET`       | `utf-8`     | Charset appended to the content type when absent |
//! | `SWITCHYARD_SURFACE_ERRORS`| `false`     | Re-raise failures to the host instead of converting them to responses (development aid) |

use std::env;

/// Configuration for a [`Dispatcher`](crate::dispatcher::Dispatcher) instance.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Content type applied at the Output phase when the response carries none.
    pub default_content_type: String,
    /// Charset appended to the outgoing content type when it lacks one.
    pub charset: String,
    /// When set, the exception phase skips classification and re-raises the
    /// failure to the caller. Intended for development tooling, not production.
    pub surface_errors: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_content_type: "text/html".to_string(),
            charset: "utf-8".to_string(),
            surface_errors: false,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from `SWITCHYARD_*` environment variables, falling
    /// back to the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_content_type: env::var("SWITCHYARD_CONTENT_TYPE")
                .unwrap_or(defaults.default_content_type),
            charset: env::var("SWITCHYARD_CHARSET").unwrap_or(defaults.charset),
            surface_errors: env::var("SWITCHYARD_SURFACE_ERRORS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "on"))
                .unwrap_or(defaults.surface_errors),
        }
    }
}

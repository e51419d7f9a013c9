use std::sync::RwLock;

use http::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::message::{HEADER_ETAG, HEADER_IF_NONE_MATCH};
use crate::router::RoutePattern;

use super::Plugin;

/// Entity-tag revalidation for GET requests.
///
/// Captures the client's `If-None-Match` validator at the start of the run,
/// hashes the produced response body after dispatch, and either answers
/// `304 Not Modified` with an empty body (validator still current) or stamps
/// an `ETag` header the client can send back next time. Responses that
/// already carry an `ETag` are left alone.
pub struct EtagPlugin {
    request_etag: RwLock<Option<String>>,
}

impl Default for EtagPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EtagPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_etag: RwLock::new(None),
        }
    }

    fn body_etag(body_bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body_bytes);
        let digest = format!("{:x}", hasher.finalize());
        // First 16 hex chars are plenty for a validator.
        digest.chars().take(16).collect()
    }
}

impl Plugin for EtagPlugin {
    fn name(&self) -> &str {
        "etag"
    }

    fn routes(&self) -> Vec<RoutePattern> {
        vec![RoutePattern::new("/*", Method::GET)]
    }

    fn preferred_order(&self) -> i32 {
        11
    }

    fn on_start(&self, system: &mut Dispatcher) -> Result<(), DispatchError> {
        let validator = system
            .request()
            .and_then(|request| request.header(HEADER_IF_NONE_MATCH))
            .map(str::to_string);
        if let Ok(mut slot) = self.request_etag.write() {
            *slot = validator;
        }
        Ok(())
    }

    fn post_dispatch(&self, system: &mut Dispatcher) -> Result<(), DispatchError> {
        let Some(response) = system.response_mut() else {
            return Ok(());
        };

        let etag = Self::body_etag(&response.body_bytes());
        let validator = self
            .request_etag
            .read()
            .ok()
            .and_then(|slot| slot.clone());

        if validator.as_deref() == Some(etag.as_str()) {
            response.set_status(304);
            response.set_body(Value::Null);
        } else if !response.header_exists(HEADER_ETAG) {
            response.set_header(HEADER_ETAG, etag);
        }
        Ok(())
    }
}

//! The contract a request handler implements.
//!
//! One resource handles one route; the dispatcher calls the operation
//! matching the request's HTTP method during the Dispatch phase. Default
//! method bodies refuse with `MethodNotAllowed`, so an implementor only
//! overrides the verbs it supports — plus [`allowed_methods`]
//! (Resource::allowed_methods) so the refusal can disclose what *is*
//! supported in the error response and its `Allow` header.

use http::Method;

use crate::error::DispatchError;
use crate::message::{Request, Response};

/// A handler for one mapped route, offering up to four operations.
pub trait Resource: Send + Sync {
    /// The operations this resource supports. Drives the allowed-method
    /// disclosure on refusals; override together with the verbs.
    fn allowed_methods(&self) -> Vec<Method> {
        Vec::new()
    }

    /// Retrieve a representation of the resource.
    fn get(&self, _request: &Request) -> Result<Response, DispatchError> {
        Err(DispatchError::method_not_allowed(
            Method::GET,
            self.allowed_methods(),
        ))
    }

    /// Create or replace the resource with the request contents.
    fn put(&self, _request: &Request) -> Result<Response, DispatchError> {
        Err(DispatchError::method_not_allowed(
            Method::PUT,
            self.allowed_methods(),
        ))
    }

    /// Accept the request contents as a new subordinate of the resource.
    fn post(&self, _request: &Request) -> Result<Response, DispatchError> {
        Err(DispatchError::method_not_allowed(
            Method::POST,
            self.allowed_methods(),
        ))
    }

    /// Delete the resource.
    fn delete(&self, _request: &Request) -> Result<Response, DispatchError> {
        Err(DispatchError::method_not_allowed(
            Method::DELETE,
            self.allowed_methods(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct GetOnly;

    impl Resource for GetOnly {
        fn allowed_methods(&self) -> Vec<Method> {
            vec![Method::GET]
        }

        fn get(&self, _request: &Request) -> Result<Response, DispatchError> {
            Ok(Response::json(200, json!({"ok": true})))
        }
    }

    #[test]
    fn unimplemented_verbs_disclose_the_allowed_list() {
        let resource = GetOnly;
        let request = Request::new(Method::POST, "/thing");
        let error = resource.post(&request).unwrap_err();
        match error {
            DispatchError::MethodNotAllowed { method, allowed } => {
                assert_eq!(method, Method::POST);
                assert_eq!(allowed, vec![Method::GET]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

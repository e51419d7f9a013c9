//! # Switchyard
//!
//! **Switchyard** is a request-dispatch core: it maps an incoming
//! URI + method pair to a registered handler through a wildcard-aware trie,
//! executes the handler inside a fixed processing lifecycle, and routes
//! cross-cutting plugin hooks around that lifecycle.
//!
//! ## Architecture
//!
//! The library is organized into a handful of small modules:
//!
//! - **[`router`]** — route patterns and the resource trie. Resolution is a
//!   single, non-backtracking descent: exact segment match first, wildcard
//!   fallback second, no sibling retries.
//! - **[`dispatcher`]** — the state machine driving the phase sequence
//!   Start → Route → Pre-Dispatch → Dispatch → Post-Dispatch → Output → End,
//!   with a single exception phase that converts failures into 404/405/500
//!   responses.
//! - **[`plugin`]** — priority-ordered cross-cutting hooks matched to
//!   requests with the same segment matcher the trie uses.
//! - **[`resource`]** / **[`registry`]** — the four-verb handler contract and
//!   the explicit identifier → factory table the Route phase consults.
//! - **[`cache`]** — the contract (plus file and memory implementations)
//!   that lets the built trie and the computed plugin order survive across
//!   constructions.
//! - **[`message`]** — the request/response boundary types; the transport
//!   that produces and consumes them is the host's business.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use http::Method;
//! use serde_json::json;
//! use switchyard::{
//!     DispatchConfig, Dispatcher, HandlerRegistry, PluginPipeline, Request, Resource,
//!     ResourceManifest, ResourceTrie, Response, RoutePattern,
//! };
//!
//! struct Hello;
//!
//! impl Resource for Hello {
//!     fn allowed_methods(&self) -> Vec<Method> {
//!         vec![Method::GET]
//!     }
//!
//!     fn get(&self, _request: &Request) -> Result<Response, switchyard::DispatchError> {
//!         Ok(Response::json(200, json!({ "hello": "world" })))
//!     }
//! }
//!
//! fn main() -> Result<(), switchyard::DispatchError> {
//!     let manifest = ResourceManifest::new("demo")
//!         .route(RoutePattern::new("/hello", Method::GET), "hello");
//!     let trie = ResourceTrie::from_manifest(&manifest, None)?;
//!
//!     let mut registry = HandlerRegistry::new();
//!     registry.register("hello", || Arc::new(Hello));
//!
//!     let mut dispatcher = Dispatcher::new(
//!         trie,
//!         registry,
//!         PluginPipeline::new(),
//!         DispatchConfig::from_env(),
//!     );
//!
//!     dispatcher.set_request(Request::new(Method::GET, "/hello"))?;
//!     let response = dispatcher.run()?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```
//!
//! ## Execution model
//!
//! Execution is single-threaded and cooperative: one `run()` processes one
//! request to completion. A dispatcher is typically constructed once per
//! process and reused across the requests that process serves sequentially;
//! a nested or concurrent `run()` on one instance fails fast with
//! `AlreadyRunning` rather than corrupt shared phase state. Shared caches
//! are read-mostly after a one-time population, and the file cache persists
//! atomically so concurrent processes never observe a torn file.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod plugin;
pub mod registry;
pub mod resource;
pub mod router;

pub use cache::{Cache, FileCache, MemoryCache};
pub use config::DispatchConfig;
pub use dispatcher::{DispatchPhase, Dispatcher, ErrorResponder};
pub use error::DispatchError;
pub use message::{Request, Response};
pub use plugin::{EtagPlugin, Plugin, PluginPipeline};
pub use registry::HandlerRegistry;
pub use resource::Resource;
pub use router::{ResolvedMatch, ResourceManifest, ResourceTrie, RoutePattern};

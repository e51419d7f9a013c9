//! # Plugin Module
//!
//! Cross-cutting hooks around the dispatch phases.
//!
//! A [`Plugin`] declares which requests it applies to (a set of
//! [`RoutePattern`](crate::router::RoutePattern)s), a preferred order
//! (larger runs earlier), and up to five hooks. The [`PluginPipeline`]
//! owns the registered plugins, computes their invocation order once, and
//! walks them at each lifecycle point, skipping plugins whose routes do not
//! match the current request.
//!
//! Hooks receive the dispatcher itself as their context, which is how a
//! plugin reads the current request, rewrites the in-flight response, or
//! short-circuits the run by injecting a response or resource. Hook
//! failures are not isolated: the first error aborts the remaining plugins
//! for that hook point and propagates to the dispatcher's exception phase
//! unmodified.

mod core;
mod etag;

pub use core::{HookPoint, Plugin, PluginPipeline, ORDER_CACHE_KEY};
pub use etag::EtagPlugin;

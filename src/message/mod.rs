//! # Message Module
//!
//! Request and response boundary types carried through the dispatch
//! lifecycle. The transport that produces requests and consumes serialized
//! responses is a host concern; these types only model what the lifecycle
//! itself needs — method, path segments, headers, and a JSON-or-text body.

mod request;
mod response;

pub use request::{parse_query_params, Request, HEADER_ACCEPT, HEADER_IF_NONE_MATCH};
pub use response::{
    Response, HEADER_ALLOW, HEADER_CONTENT_TYPE, HEADER_ETAG,
};

use smallvec::SmallVec;

/// Maximum inline headers before heap allocation. Most requests carry well
/// under sixteen headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage shared by [`Request`] and [`Response`].
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

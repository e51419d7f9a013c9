//! # Router Module
//!
//! Path matching and resource resolution.
//!
//! Two pieces live here:
//!
//! - [`RoutePattern`] — an immutable method + segment-list pattern with a
//!   configurable wildcard token. Its positional matcher (exact literal or
//!   wildcard per position, segment counts equal) is shared by the trie and
//!   by the plugin pipeline's applicability test.
//! - [`ResourceTrie`] — a segment-keyed tree mapping paths to handler
//!   identifiers. Resolution is a single, non-backtracking descent: at each
//!   depth the exact child wins, the wildcard child is the fallback, and a
//!   dead end stops the walk without retrying sibling subtrees. The deepest
//!   visited node carrying a handler is the result.
//!
//! The non-backtracking walk is a deliberate contract, not an optimization:
//! once the descent commits past a node, a wildcard sibling at a shallower
//! depth is never revisited. Hosts that want longest-match semantics want a
//! different router.
//!
//! The built trie can be persisted through the [`Cache`](crate::cache::Cache)
//! contract keyed by the manifest identity, skipping the build on later
//! constructions. Resolution results are memoized in a single slot keyed by
//! the path so an existence probe immediately followed by a fetch walks the
//! tree once.

mod pattern;
mod trie;

pub use pattern::{RoutePattern, DEFAULT_WILDCARD};
pub use trie::{ResolvedMatch, ResourceManifest, ResourceTrie, SegmentVec, MAX_INLINE_SEGMENTS};

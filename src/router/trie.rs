use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::error::DispatchError;

use super::pattern::RoutePattern;

/// Maximum path depth before the consumed-segment list spills to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// Stack-allocated storage for the segments consumed during a descent.
pub type SegmentVec = SmallVec<[String; MAX_INLINE_SEGMENTS]>;

/// Reserved child key for wildcard segments. Literal keys are path segments
/// and can never contain `/`, so this string cannot collide with one.
const WILDCARD_KEY: &str = "/*/";

/// A trie child key: a lowercased literal segment or the wildcard slot.
///
/// All wildcard route segments share the single wildcard slot regardless of
/// the token they were written with, which is what makes the wildcard
/// fallback a constant-time lookup during descent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SegmentKey {
    Literal(String),
    Wildcard,
}

impl SegmentKey {
    fn from_route_segment(segment: &str, pattern: &RoutePattern) -> Self {
        if pattern.is_wildcard_segment(segment) {
            Self::Wildcard
        } else {
            Self::Literal(segment.to_ascii_lowercase())
        }
    }
}

impl Serialize for SegmentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(segment) => serializer.serialize_str(segment),
            Self::Wildcard => serializer.serialize_str(WILDCARD_KEY),
        }
    }
}

impl<'de> Deserialize<'de> for SegmentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = SegmentKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a path segment key")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SegmentKey, E> {
                if value == WILDCARD_KEY {
                    Ok(SegmentKey::Wildcard)
                } else {
                    Ok(SegmentKey::Literal(value.to_string()))
                }
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

/// One node of the resource trie. Holds at most one leaf handler id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrieNode {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    children: HashMap<SegmentKey, TrieNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    leaf: Option<String>,
}

/// Result of successfully resolving a path to a handler.
///
/// Ephemeral and recomputed per request; the trie memoizes the most recent
/// one so an existence check followed by a fetch resolves once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    /// The handler identifier stored at the matched leaf.
    pub handler_id: String,
    /// The concrete request segments consumed to reach the leaf.
    pub consumed: SegmentVec,
}

/// Declarative route table built at startup: an identity for whole-trie
/// caching plus ordered `(pattern, handler id)` registrations.
#[derive(Debug, Clone, Default)]
pub struct ResourceManifest {
    identity: String,
    entries: Vec<(RoutePattern, String)>,
}

impl ResourceManifest {
    /// A manifest whose identity keys the persisted trie in the cache.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            entries: Vec::new(),
        }
    }

    /// Register a route, builder style.
    #[must_use]
    pub fn route(mut self, pattern: RoutePattern, handler_id: &str) -> Self {
        self.entries.push((pattern, handler_id.to_string()));
        self
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn entries(&self) -> &[(RoutePattern, String)] {
        &self.entries
    }
}

/// Segment-keyed trie resolving hierarchical paths to handler identifiers.
///
/// See the [module docs](crate::router) for the descent contract.
#[derive(Debug)]
pub struct ResourceTrie {
    root: TrieNode,
    last_match: RwLock<Option<(String, ResolvedMatch)>>,
    walks: AtomicU64,
}

impl Default for ResourceTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTrie {
    /// An empty trie; populate it with [`insert`](Self::insert).
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            last_match: RwLock::new(None),
            walks: AtomicU64::new(0),
        }
    }

    /// Build a trie from a manifest, or load it from the cache when an entry
    /// for the manifest identity exists — the build step is then skipped
    /// entirely.
    pub fn from_manifest(
        manifest: &ResourceManifest,
        cache: Option<Arc<dyn Cache>>,
    ) -> Result<Self, DispatchError> {
        let cache_key = format!("trie-{}", manifest.identity());

        if let Some(cache) = &cache {
            if let Some(value) = cache.get(&cache_key) {
                match serde_json::from_value::<TrieNode>(value) {
                    Ok(root) => {
                        info!(identity = manifest.identity(), "resource map loaded from cache");
                        let mut trie = Self::new();
                        trie.root = root;
                        return Ok(trie);
                    }
                    Err(error) => {
                        warn!(
                            identity = manifest.identity(),
                            error = %error,
                            "cached resource map is unreadable; rebuilding"
                        );
                    }
                }
            }
        }

        let mut trie = Self::new();
        for (pattern, handler_id) in manifest.entries() {
            trie.insert(pattern, handler_id)?;
        }
        info!(
            identity = manifest.identity(),
            routes = manifest.entries().len(),
            "resource map built"
        );

        if let Some(cache) = cache {
            match serde_json::to_value(&trie.root) {
                Ok(value) => cache.store(&cache_key, value),
                Err(error) => warn!(error = %error, "failed to serialize resource map for caching"),
            }
        }

        Ok(trie)
    }

    /// Register a handler under a route pattern.
    ///
    /// Descends the trie creating intermediate nodes; wildcard segments are
    /// normalized to the shared wildcard slot. Fails with
    /// [`DispatchError::RouteConflict`] when the final node already carries a
    /// leaf — a duplicate mapping is a configuration error, caught here
    /// rather than silently shadowed.
    pub fn insert(
        &mut self,
        pattern: &RoutePattern,
        handler_id: impl Into<String>,
    ) -> Result<(), DispatchError> {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            let key = SegmentKey::from_route_segment(segment, pattern);
            node = node.children.entry(key).or_default();
        }
        if node.leaf.is_some() {
            return Err(DispatchError::route_conflict(pattern.path()));
        }
        let handler_id = handler_id.into();
        debug!(route = pattern.path(), handler = %handler_id, "route registered");
        node.leaf = Some(handler_id);

        if let Ok(mut slot) = self.last_match.write() {
            *slot = None;
        }
        Ok(())
    }

    /// Resolve a path to its handler.
    ///
    /// Single descent, no backtracking: the exact child wins at each depth,
    /// the wildcard child is the fallback, a dead end stops the walk. The
    /// deepest visited node carrying a leaf is the result; if none does, the
    /// path is unmapped.
    pub fn resolve(&self, segments: &[&str]) -> Result<ResolvedMatch, DispatchError> {
        let path = join_path(segments);
        if let Some(found) = self.memoized(&path) {
            debug!(path = %path, "resolution served from memo slot");
            return Ok(found);
        }

        match self.descend(segments) {
            Some(found) => {
                debug!(path = %path, handler = %found.handler_id, "path resolved");
                self.memoize(path, &found);
                Ok(found)
            }
            None => {
                warn!(path = %path, "no resource matched");
                Err(DispatchError::resource_not_found(path))
            }
        }
    }

    /// Whether a path resolves, without surfacing the handler.
    ///
    /// On success the match lands in the memo slot, so an immediately
    /// following [`resolve`](Self::resolve) for the same path does not walk
    /// the trie again.
    pub fn exists(&self, segments: &[&str]) -> bool {
        let path = join_path(segments);
        if self.memoized(&path).is_some() {
            return true;
        }
        match self.descend(segments) {
            Some(found) => {
                self.memoize(path, &found);
                true
            }
            None => false,
        }
    }

    /// Number of trie descents performed so far. Memo-served resolutions do
    /// not count.
    #[must_use]
    pub fn walk_count(&self) -> u64 {
        self.walks.load(Ordering::Relaxed)
    }

    fn memoized(&self, path: &str) -> Option<ResolvedMatch> {
        let slot = self.last_match.read().ok()?;
        match &*slot {
            Some((key, found)) if key == path => Some(found.clone()),
            _ => None,
        }
    }

    fn memoize(&self, path: String, found: &ResolvedMatch) {
        if let Ok(mut slot) = self.last_match.write() {
            *slot = Some((path, found.clone()));
        }
    }

    fn descend(&self, segments: &[&str]) -> Option<ResolvedMatch> {
        self.walks.fetch_add(1, Ordering::Relaxed);

        let mut node = &self.root;
        let mut consumed = SegmentVec::new();
        let mut deepest: Option<(String, usize)> = node
            .leaf
            .as_ref()
            .map(|handler_id| (handler_id.clone(), 0));

        for segment in segments {
            let literal = SegmentKey::Literal(segment.to_ascii_lowercase());
            let next = node
                .children
                .get(&literal)
                .or_else(|| node.children.get(&SegmentKey::Wildcard));
            let Some(child) = next else {
                // Dead end: stop immediately, no sibling retries.
                break;
            };
            consumed.push((*segment).to_string());
            node = child;
            if let Some(handler_id) = &node.leaf {
                deepest = Some((handler_id.clone(), consumed.len()));
            }
        }

        deepest.map(|(handler_id, depth)| {
            consumed.truncate(depth);
            ResolvedMatch {
                handler_id,
                consumed,
            }
        })
    }
}

fn join_path(segments: &[&str]) -> String {
    let mut path = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn trie_with(routes: &[(&str, &str)]) -> ResourceTrie {
        let mut trie = ResourceTrie::new();
        for (path, handler) in routes {
            trie.insert(&RoutePattern::new(path, Method::GET), *handler)
                .expect("insert route");
        }
        trie
    }

    #[test]
    fn resolves_exact_literal_paths() {
        let trie = trie_with(&[("/hello", "hello"), ("/users/list", "list_users")]);
        assert_eq!(trie.resolve(&["hello"]).expect("match").handler_id, "hello");
        assert_eq!(
            trie.resolve(&["users", "list"]).expect("match").handler_id,
            "list_users"
        );
    }

    #[test]
    fn literal_lookup_is_case_insensitive() {
        let trie = trie_with(&[("/Hello", "hello")]);
        assert_eq!(trie.resolve(&["HELLO"]).expect("match").handler_id, "hello");
    }

    #[test]
    fn wildcard_is_the_fallback_not_the_default() {
        let trie = trie_with(&[("/hello", "hello"), ("/*", "fallback")]);
        assert_eq!(trie.resolve(&["hello"]).expect("match").handler_id, "hello");
        assert_eq!(
            trie.resolve(&["anything"]).expect("match").handler_id,
            "fallback"
        );
    }

    #[test]
    fn empty_path_is_unmapped_unless_root_registered() {
        let trie = trie_with(&[("/*", "fallback")]);
        assert!(matches!(
            trie.resolve(&[]),
            Err(DispatchError::ResourceNotFound { .. })
        ));

        let rooted = trie_with(&[("/", "root")]);
        assert_eq!(rooted.resolve(&[]).expect("match").handler_id, "root");
    }

    #[test]
    fn duplicate_leaf_registration_conflicts() {
        let mut trie = ResourceTrie::new();
        let pattern = RoutePattern::new("/users/*", Method::GET);
        trie.insert(&pattern, "first").expect("first insert");
        let second = trie.insert(&pattern, "second");
        assert!(matches!(second, Err(DispatchError::RouteConflict { .. })));
        // The original mapping is untouched.
        assert_eq!(
            trie.resolve(&["users", "42"]).expect("match").handler_id,
            "first"
        );
    }

    #[test]
    fn shared_prefix_with_differing_final_segment_is_fine() {
        let mut trie = ResourceTrie::new();
        trie.insert(&RoutePattern::new("/users/list", Method::GET), "list")
            .expect("insert");
        trie.insert(&RoutePattern::new("/users/search", Method::GET), "search")
            .expect("insert");
        assert_eq!(
            trie.resolve(&["users", "search"]).expect("match").handler_id,
            "search"
        );
    }

    #[test]
    fn dead_end_returns_the_deepest_leaf_already_visited() {
        let trie = trie_with(&[("/docs", "docs"), ("/docs/api/reference", "reference")]);
        // Walk commits into /docs, then /docs/api (interior), then dies at
        // "missing" — the deepest leaf seen is /docs.
        let found = trie.resolve(&["docs", "api", "missing"]).expect("match");
        assert_eq!(found.handler_id, "docs");
        assert_eq!(found.consumed.as_slice(), ["docs"]);
    }

    #[test]
    fn no_backtracking_into_shallower_wildcard_siblings() {
        let trie = trie_with(&[("/a", "a"), ("/*/z", "wild_z")]);
        // "a" matches the exact child, which has no children; the walk stops
        // there instead of retrying the wildcard sibling that could have
        // reached /a/z.
        let found = trie.resolve(&["a", "z"]).expect("match");
        assert_eq!(found.handler_id, "a");
    }

    #[test]
    fn unmatched_path_is_resource_not_found() {
        let trie = trie_with(&[("/users", "users")]);
        let error = trie.resolve(&["posts", "1"]).unwrap_err();
        assert!(matches!(error, DispatchError::ResourceNotFound { .. }));
    }

    #[test]
    fn exists_primes_the_memo_slot_for_resolve() {
        let trie = trie_with(&[("/users/*", "get_user")]);
        assert!(trie.exists(&["users", "42"]));
        assert_eq!(trie.walk_count(), 1);
        assert_eq!(
            trie.resolve(&["users", "42"]).expect("match").handler_id,
            "get_user"
        );
        assert_eq!(trie.walk_count(), 1);

        // A different path evicts the slot and walks again.
        assert!(trie.exists(&["users", "7"]));
        assert_eq!(trie.walk_count(), 2);
    }

    #[test]
    fn exists_is_false_for_unmapped_paths() {
        let trie = trie_with(&[("/users", "users")]);
        assert!(!trie.exists(&["nope"]));
    }

    #[test]
    fn consumed_segments_preserve_request_spelling() {
        let trie = trie_with(&[("/users/*", "get_user")]);
        let found = trie.resolve(&["Users", "AbC"]).expect("match");
        assert_eq!(found.consumed.as_slice(), ["Users", "AbC"]);
    }

    #[test]
    fn trie_round_trips_through_serde() {
        let trie = trie_with(&[("/hello", "hello"), ("/users/*", "get_user")]);
        let value = serde_json::to_value(&trie.root).expect("serialize");
        let root: TrieNode = serde_json::from_value(value).expect("deserialize");
        let mut restored = ResourceTrie::new();
        restored.root = root;
        assert_eq!(
            restored.resolve(&["users", "42"]).expect("match").handler_id,
            "get_user"
        );
    }
}

use serde_json::Value;

/// Key/value store used to skip expensive rebuild work across constructions.
///
/// Implementations use interior mutability; consumers hold them behind
/// `Arc<dyn Cache>` and share one instance between the trie and the plugin
/// pipeline.
pub trait Cache: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value under `key`, replacing any existing entry.
    fn store(&self, key: &str, value: Value);

    /// Check whether `key` holds a value.
    fn exists(&self, key: &str) -> bool;

    /// Remove the entry stored under `key`.
    fn clear(&self, key: &str);

    /// Empty the cache.
    fn clear_all(&self);
}

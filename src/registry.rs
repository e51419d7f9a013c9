//! Handler registry: the compiled table from handler identifier to factory.
//!
//! Trie leaves store handler identifiers, not handlers; this registry turns
//! an identifier into a live [`Resource`] during the Route phase. It is
//! populated explicitly at startup — nothing is ever inferred from file
//! loading or declaration order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::resource::Resource;

/// Factory producing a resource instance for one request.
pub type ResourceFactory = Box<dyn Fn() -> Arc<dyn Resource> + Send + Sync>;

/// Maps handler identifiers (trie leaf markers) to resource factories.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, ResourceFactory>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a handler identifier. Re-registering an
    /// identifier replaces the previous factory.
    pub fn register<F>(&mut self, handler_id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Resource> + Send + Sync + 'static,
    {
        if self.factories.contains_key(handler_id) {
            warn!(handler = handler_id, "replacing an existing handler factory");
        }
        self.factories
            .insert(handler_id.to_string(), Box::new(factory));
        info!(
            handler = handler_id,
            total_handlers = self.factories.len(),
            "handler registered"
        );
    }

    /// Instantiate the resource for a handler identifier, or `None` when the
    /// identifier was never registered.
    #[must_use]
    pub fn construct(&self, handler_id: &str) -> Option<Arc<dyn Resource>> {
        self.factories.get(handler_id).map(|factory| factory())
    }

    #[must_use]
    pub fn contains(&self, handler_id: &str) -> bool {
        self.factories.contains_key(handler_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

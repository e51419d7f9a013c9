use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use http::Method;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::message::Request;
use crate::router::RoutePattern;

/// Fixed cache key under which the computed invocation order is persisted.
pub const ORDER_CACHE_KEY: &str = "plugin-order";

/// A cross-cutting hook bundle invoked around the dispatch phases.
///
/// All hooks default to no-ops; implement only the lifecycle points you
/// care about. The `system` argument is the dispatcher driving the current
/// run — use it to read the request ([`Dispatcher::request`]), rewrite the
/// response ([`Dispatcher::response_mut`]), or terminate early
/// ([`Dispatcher::output_response`], [`Dispatcher::dispatch_resource`]).
pub trait Plugin: Send + Sync {
    /// Stable identifier; keys the per-request applicability memo and the
    /// persisted invocation order.
    fn name(&self) -> &str;

    /// The requests this plugin applies to. A plugin is invoked when any of
    /// its routes matches the current request's method and path.
    fn routes(&self) -> Vec<RoutePattern>;

    /// Invocation priority: a larger number runs earlier. Ties run in
    /// registration order.
    fn preferred_order(&self) -> i32;

    /// Before routing, once the run is active.
    fn on_start(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        Ok(())
    }

    /// After a resource has been resolved, before its method is called.
    fn pre_dispatch(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        Ok(())
    }

    /// After the resource produced a response, before output.
    fn post_dispatch(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        Ok(())
    }

    /// After the response has been output.
    fn on_end(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        Ok(())
    }

    /// When a failure is being converted into a terminal response.
    fn on_exception(
        &self,
        _system: &mut Dispatcher,
        _error: &DispatchError,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// The lifecycle point being invoked.
#[derive(Clone, Copy)]
pub enum HookPoint<'a> {
    OnStart,
    PreDispatch,
    PostDispatch,
    OnEnd,
    OnException(&'a DispatchError),
}

impl HookPoint<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::OnStart => "on_start",
            Self::PreDispatch => "pre_dispatch",
            Self::PostDispatch => "post_dispatch",
            Self::OnEnd => "on_end",
            Self::OnException(_) => "on_exception",
        }
    }
}

struct BoundRequest {
    method: Method,
    segments: Vec<String>,
}

/// Ordered collection of plugins matched against one request at a time.
///
/// The invocation order is computed lazily on first use and never changes
/// for the life of the pipeline; route applicability is computed once per
/// (plugin, request) and reused across all five hook points of that
/// request.
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
    order: OnceCell<Vec<usize>>,
    bound: RwLock<Option<BoundRequest>>,
    memo: RwLock<HashMap<String, bool>>,
    cache: Option<Arc<dyn Cache>>,
}

impl Default for PluginPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            order: OnceCell::new(),
            bound: RwLock::new(None),
            memo: RwLock::new(HashMap::new()),
            cache: None,
        }
    }

    /// A pipeline that persists its computed invocation order through the
    /// given cache, skipping the sort on later constructions.
    #[must_use]
    pub fn with_cache(cache: Arc<dyn Cache>) -> Self {
        let mut pipeline = Self::new();
        pipeline.cache = Some(cache);
        pipeline
    }

    /// Register a plugin. Registration order breaks priority ties.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!(plugin = plugin.name(), order = plugin.preferred_order(), "plugin registered");
        self.plugins.push(plugin);
    }

    /// Enumerate candidate plugins from fallible sources, keeping those that
    /// construct successfully. Failed candidates are skipped, not errors —
    /// a source is free to offer definitions that do not apply to this
    /// deployment.
    pub fn discover<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = anyhow::Result<Arc<dyn Plugin>>>,
    {
        for candidate in candidates {
            match candidate {
                Ok(plugin) => self.register(plugin),
                Err(error) => debug!(error = %error, "skipping plugin candidate"),
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Snapshot the request the following hook invocations are for, and
    /// forget the previous request's applicability results.
    pub fn bind_request(&self, request: &Request) {
        if let Ok(mut bound) = self.bound.write() {
            *bound = Some(BoundRequest {
                method: request.method().clone(),
                segments: request
                    .path_segments()
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            });
        }
        if let Ok(mut memo) = self.memo.write() {
            memo.clear();
        }
    }

    /// Invoke one hook point across all applicable plugins, in order.
    ///
    /// The first hook error aborts the remaining plugins and propagates
    /// unmodified.
    pub fn invoke(
        &self,
        hook: HookPoint<'_>,
        system: &mut Dispatcher,
    ) -> Result<(), DispatchError> {
        for &index in self.order() {
            let plugin = Arc::clone(&self.plugins[index]);
            if !self.applies(plugin.as_ref()) {
                continue;
            }
            debug!(plugin = plugin.name(), hook = hook.name(), "plugin hook invoked");
            match hook {
                HookPoint::OnStart => plugin.on_start(system)?,
                HookPoint::PreDispatch => plugin.pre_dispatch(system)?,
                HookPoint::PostDispatch => plugin.post_dispatch(system)?,
                HookPoint::OnEnd => plugin.on_end(system)?,
                HookPoint::OnException(error) => plugin.on_exception(system, error)?,
            }
        }
        Ok(())
    }

    fn order(&self) -> &[usize] {
        self.order.get_or_init(|| self.compute_order())
    }

    fn compute_order(&self) -> Vec<usize> {
        let names: Vec<String> = self
            .plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect();

        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(ORDER_CACHE_KEY) {
                if let Ok(cached) = serde_json::from_value::<Vec<String>>(value) {
                    if let Some(order) = order_from_names(&cached, &names) {
                        debug!("plugin order loaded from cache");
                        return order;
                    }
                    warn!("cached plugin order does not cover the registered plugins; recomputing");
                }
            }
        }

        // Stable sort: ties keep registration order.
        let mut order: Vec<usize> = (0..self.plugins.len()).collect();
        order.sort_by_key(|&index| Reverse(self.plugins[index].preferred_order()));

        if let Some(cache) = &self.cache {
            let ordered_names: Vec<&str> = order
                .iter()
                .map(|&index| self.plugins[index].name())
                .collect();
            cache.store(ORDER_CACHE_KEY, serde_json::json!(ordered_names));
        }

        info!(plugins = order.len(), "plugin pipeline ordered");
        order
    }

    fn applies(&self, plugin: &dyn Plugin) -> bool {
        let name = plugin.name().to_string();
        if let Ok(memo) = self.memo.read() {
            if let Some(&matched) = memo.get(&name) {
                return matched;
            }
        }

        let matched = match self.bound.read() {
            Ok(bound) => match &*bound {
                Some(request) => {
                    let segments: Vec<&str> =
                        request.segments.iter().map(String::as_str).collect();
                    plugin
                        .routes()
                        .iter()
                        .any(|route| route.matches(&request.method, &segments))
                }
                None => false,
            },
            Err(_) => false,
        };

        if let Ok(mut memo) = self.memo.write() {
            memo.insert(name, matched);
        }
        matched
    }
}

fn order_from_names(cached: &[String], names: &[String]) -> Option<Vec<usize>> {
    if cached.len() != names.len() {
        return None;
    }
    cached
        .iter()
        .map(|cached_name| names.iter().position(|name| name == cached_name))
        .collect()
}

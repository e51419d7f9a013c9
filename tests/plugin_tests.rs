//! Integration tests for the plugin pipeline: ordering, applicability,
//! per-request memoization, discovery, order caching, and the ETag plugin.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::Method;
use serde_json::json;
use switchyard::{
    Cache, DispatchConfig, DispatchError, Dispatcher, EtagPlugin, HandlerRegistry, MemoryCache,
    Plugin, PluginPipeline, Request, Resource, ResourceManifest, ResourceTrie, Response,
    RoutePattern,
};

mod tracing_util;
use tracing_util::TestTracing;

#[derive(Clone, Default)]
struct NullSink;

impl Write for NullSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct StaticResource {
    body: serde_json::Value,
}

impl Resource for StaticResource {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    fn get(&self, _request: &Request) -> Result<Response, DispatchError> {
        Ok(Response::json(200, self.body.clone()))
    }
}

type CallLog = Arc<Mutex<Vec<String>>>;

struct ProbePlugin {
    name: &'static str,
    order: i32,
    routes: Vec<RoutePattern>,
    calls: CallLog,
    routes_queried: AtomicUsize,
    fail_on_start: bool,
}

impl ProbePlugin {
    fn new(name: &'static str, order: i32, routes: Vec<RoutePattern>, calls: &CallLog) -> Self {
        Self {
            name,
            order,
            routes,
            calls: Arc::clone(calls),
            routes_queried: AtomicUsize::new(0),
            fail_on_start: false,
        }
    }

    fn record(&self, hook: &str) {
        self.calls
            .lock()
            .expect("call log lock")
            .push(format!("{}:{}", self.name, hook));
    }
}

impl Plugin for ProbePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn routes(&self) -> Vec<RoutePattern> {
        self.routes_queried.fetch_add(1, Ordering::Relaxed);
        self.routes.clone()
    }

    fn preferred_order(&self) -> i32 {
        self.order
    }

    fn on_start(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        self.record("on_start");
        if self.fail_on_start {
            return Err(DispatchError::Other(anyhow::anyhow!("hook blew up")));
        }
        Ok(())
    }

    fn pre_dispatch(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        self.record("pre_dispatch");
        Ok(())
    }

    fn post_dispatch(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        self.record("post_dispatch");
        Ok(())
    }

    fn on_end(&self, _system: &mut Dispatcher) -> Result<(), DispatchError> {
        self.record("on_end");
        Ok(())
    }

    fn on_exception(
        &self,
        _system: &mut Dispatcher,
        _error: &DispatchError,
    ) -> Result<(), DispatchError> {
        self.record("on_exception");
        Ok(())
    }
}

fn any_get() -> Vec<RoutePattern> {
    vec![RoutePattern::new("/*", Method::GET)]
}

fn dispatcher_with(pipeline: PluginPipeline) -> Dispatcher {
    let manifest = ResourceManifest::new("plugin-tests")
        .route(RoutePattern::new("/x", Method::GET), "static");
    let trie = ResourceTrie::from_manifest(&manifest, None).expect("build trie");
    let mut registry = HandlerRegistry::new();
    registry.register("static", || {
        Arc::new(StaticResource {
            body: json!({ "n": 1 }),
        })
    });
    let mut dispatcher = Dispatcher::new(trie, registry, pipeline, DispatchConfig::default());
    dispatcher.set_sink(Box::new(NullSink));
    dispatcher
}

fn run_once(dispatcher: &mut Dispatcher, request: Request) -> Result<Response, DispatchError> {
    dispatcher.set_request(request)?;
    dispatcher.run()
}

#[test]
fn higher_preferred_order_runs_earlier_at_every_hook() {
    let _tracing = TestTracing::init();
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::new();
    // Registered low-priority first to prove ordering is by priority.
    pipeline.register(Arc::new(ProbePlugin::new("low", 5, any_get(), &calls)));
    pipeline.register(Arc::new(ProbePlugin::new("high", 10, any_get(), &calls)));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    assert_eq!(
        *calls.lock().expect("call log lock"),
        vec![
            "high:on_start",
            "low:on_start",
            "high:pre_dispatch",
            "low:pre_dispatch",
            "high:post_dispatch",
            "low:post_dispatch",
            "high:on_end",
            "low:on_end",
        ]
    );
}

#[test]
fn priority_ties_run_in_registration_order() {
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::new(ProbePlugin::new("first", 7, any_get(), &calls)));
    pipeline.register(Arc::new(ProbePlugin::new("second", 7, any_get(), &calls)));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    let log = calls.lock().expect("call log lock");
    assert_eq!(log[0], "first:on_start");
    assert_eq!(log[1], "second:on_start");
}

#[test]
fn a_plugin_declaring_another_method_is_never_invoked() {
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::new(ProbePlugin::new(
        "post-only",
        1,
        vec![RoutePattern::new("/*", Method::POST)],
        &calls,
    )));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    assert!(calls.lock().expect("call log lock").is_empty());
}

#[test]
fn segment_count_mismatches_never_match() {
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::new(ProbePlugin::new(
        "two-deep",
        1,
        vec![RoutePattern::new("/x/*", Method::GET)],
        &calls,
    )));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    assert!(calls.lock().expect("call log lock").is_empty());
}

#[test]
fn applicability_is_computed_once_per_request() {
    let calls: CallLog = CallLog::default();
    let probe = Arc::new(ProbePlugin::new("probe", 1, any_get(), &calls));
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::clone(&probe) as Arc<dyn Plugin>);

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("first run");

    // Four hook points fired, one route-match computation.
    assert_eq!(calls.lock().expect("call log lock").len(), 4);
    assert_eq!(probe.routes_queried.load(Ordering::Relaxed), 1);

    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("second run");
    // A new request invalidates the memo and matches again.
    assert_eq!(probe.routes_queried.load(Ordering::Relaxed), 2);
}

#[test]
fn a_failing_hook_aborts_the_remaining_plugins() {
    let calls: CallLog = CallLog::default();
    let mut failing = ProbePlugin::new("failing", 10, any_get(), &calls);
    failing.fail_on_start = true;
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::new(failing));
    pipeline.register(Arc::new(ProbePlugin::new("later", 5, any_get(), &calls)));

    let mut dispatcher = dispatcher_with(pipeline);
    let response = run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    // The hook failure was classified like any other failure.
    assert_eq!(response.status(), 500);
    assert_eq!(
        *calls.lock().expect("call log lock"),
        vec![
            "failing:on_start",
            "failing:on_exception",
            "later:on_exception",
        ]
    );
}

#[test]
fn discovery_silently_skips_failed_candidates() {
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::new();
    pipeline.discover(vec![
        Ok(Arc::new(ProbePlugin::new("good", 1, any_get(), &calls)) as Arc<dyn Plugin>),
        Err(anyhow::anyhow!("does not apply to this deployment")),
    ]);
    assert_eq!(pipeline.len(), 1);
}

#[test]
fn the_computed_order_is_persisted_under_the_fixed_key() {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::with_cache(Arc::clone(&cache));
    pipeline.register(Arc::new(ProbePlugin::new("low", 1, any_get(), &calls)));
    pipeline.register(Arc::new(ProbePlugin::new("high", 9, any_get(), &calls)));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    let stored = cache.get("plugin-order").expect("order cached");
    let names: Vec<String> = serde_json::from_value(stored).expect("order list");
    assert_eq!(names, vec!["high", "low"]);
}

#[test]
fn a_cached_order_short_circuits_the_sort() {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    // Seed an order that contradicts the priorities.
    cache.store("plugin-order", json!(["low", "high"]));

    let calls: CallLog = CallLog::default();
    let mut pipeline = PluginPipeline::with_cache(Arc::clone(&cache));
    pipeline.register(Arc::new(ProbePlugin::new("low", 1, any_get(), &calls)));
    pipeline.register(Arc::new(ProbePlugin::new("high", 9, any_get(), &calls)));

    let mut dispatcher = dispatcher_with(pipeline);
    run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("run");

    let log = calls.lock().expect("call log lock");
    assert_eq!(log[0], "low:on_start");
    assert_eq!(log[1], "high:on_start");
}

#[test]
fn etag_plugin_stamps_and_revalidates() {
    let mut pipeline = PluginPipeline::new();
    pipeline.register(Arc::new(EtagPlugin::new()));

    let mut dispatcher = dispatcher_with(pipeline);

    let first = run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("first run");
    assert_eq!(first.status(), 200);
    let etag = first.header("ETag").expect("etag stamped").to_string();

    let revalidation = Request::new(Method::GET, "/x").with_header("If-None-Match", etag.clone());
    let second = run_once(&mut dispatcher, revalidation).expect("second run");
    assert_eq!(second.status(), 304);
    assert!(second.body_bytes().is_empty());

    // A request without the validator gets the full representation again.
    let third = run_once(&mut dispatcher, Request::new(Method::GET, "/x")).expect("third run");
    assert_eq!(third.status(), 200);
    assert_eq!(third.header("ETag"), Some(etag.as_str()));
}

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use http::Method;
use tracing::{debug, error, info};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::message::{Request, Response, HEADER_CONTENT_TYPE};
use crate::plugin::{HookPoint, PluginPipeline};
use crate::registry::HandlerRegistry;
use crate::resource::Resource;
use crate::router::ResourceTrie;

use super::respond::ErrorResponder;

/// One step of the fixed request-handling sequence.
///
/// Exactly one phase is current at any time during a run; `Start` doubles
/// as the idle state between runs, which is why input setters are permitted
/// there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Start,
    Route,
    PreDispatch,
    Dispatch,
    PostDispatch,
    Output,
    End,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "Start",
            Self::Route => "Route",
            Self::PreDispatch => "Pre-Dispatch",
            Self::Dispatch => "Dispatch",
            Self::PostDispatch => "Post-Dispatch",
            Self::Output => "Output",
            Self::End => "End",
        })
    }
}

/// The request-dispatch state machine.
///
/// Owns the resource trie, the handler registry, and the plugin pipeline;
/// [`run`](Self::run) drives one request through the phase sequence and
/// returns the terminal response (or re-raises fatal failures and, in
/// surface-errors mode, everything). Construct one per process and feed it
/// requests sequentially — see the [module docs](crate::dispatcher) for the
/// lifecycle contract.
pub struct Dispatcher {
    config: DispatchConfig,
    resource_map: ResourceTrie,
    registry: HandlerRegistry,
    pipeline: Arc<PluginPipeline>,
    responder: ErrorResponder,
    sink: Box<dyn Write + Send>,
    request: Option<Request>,
    response: Option<Response>,
    resource: Option<Arc<dyn Resource>>,
    phase: DispatchPhase,
    next_phase: DispatchPhase,
    running: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        resource_map: ResourceTrie,
        registry: HandlerRegistry,
        pipeline: PluginPipeline,
        config: DispatchConfig,
    ) -> Self {
        Self {
            config,
            resource_map,
            registry,
            pipeline: Arc::new(pipeline),
            responder: ErrorResponder::new(),
            sink: Box::new(io::stdout()),
            request: None,
            response: None,
            resource: None,
            phase: DispatchPhase::Start,
            next_phase: DispatchPhase::Start,
            running: false,
        }
    }

    /// Redirect serialized output. Defaults to stdout.
    pub fn set_sink(&mut self, sink: Box<dyn Write + Send>) {
        self.sink = sink;
    }

    /// Replace the exception-phase responder (custom error pages).
    pub fn set_error_responder(&mut self, responder: ErrorResponder) {
        self.responder = responder;
    }

    #[must_use]
    pub fn current_phase(&self) -> DispatchPhase {
        self.phase
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Mutable access to the in-flight response, for hooks that rewrite it.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Set the request to process. Permitted only in Start (the idle state):
    /// every later phase has already derived state from the request.
    pub fn set_request(&mut self, request: Request) -> Result<(), DispatchError> {
        self.guard_phase(
            &[DispatchPhase::Start],
            "the request must be set at the start state",
        )?;
        self.request = Some(request);
        Ok(())
    }

    /// Replace the resource map. Permitted only in Start.
    pub fn set_resource_map(&mut self, resource_map: ResourceTrie) -> Result<(), DispatchError> {
        self.guard_phase(
            &[DispatchPhase::Start],
            "the resource map must be set at the start state",
        )?;
        self.resource_map = resource_map;
        Ok(())
    }

    /// Shared access to the resource map (for existence probes and
    /// instrumentation).
    #[must_use]
    pub fn resource_map(&self) -> &ResourceTrie {
        &self.resource_map
    }

    /// Inject a resource directly, skipping resolution. Permitted while in
    /// Start, Route, or Pre-Dispatch; the run proceeds to Dispatch next.
    pub fn dispatch_resource(&mut self, resource: Arc<dyn Resource>) -> Result<(), DispatchError> {
        self.guard_phase(
            &[
                DispatchPhase::Start,
                DispatchPhase::Route,
                DispatchPhase::PreDispatch,
            ],
            "a resource can only be injected at the start, route, or pre-dispatch state",
        )?;
        self.resource = Some(resource);
        self.next_phase = DispatchPhase::Dispatch;
        Ok(())
    }

    /// Inject a response directly, skipping the remaining phases up to
    /// Output. Permitted in any phase except End.
    pub fn output_response(&mut self, response: Response) -> Result<(), DispatchError> {
        if self.phase == DispatchPhase::End {
            return Err(DispatchError::invalid_state(
                self.phase,
                "a response can no longer be injected at the end state",
            ));
        }
        self.response = Some(response);
        self.next_phase = DispatchPhase::Output;
        Ok(())
    }

    /// Process the current request through the full phase sequence.
    ///
    /// Returns the terminal response — the resource's on success, the
    /// classified error response on recoverable failure. Fatal failures
    /// (re-entrancy, phase violations, route conflicts) and any failure in
    /// surface-errors mode are returned as `Err` instead; the machine is
    /// reset to idle on every path.
    pub fn run(&mut self) -> Result<Response, DispatchError> {
        if self.running {
            return Err(DispatchError::AlreadyRunning);
        }
        self.reset_for_run();

        match self.run_phases() {
            Ok(()) => {
                let response = self.response.take().ok_or_else(|| {
                    DispatchError::invalid_state(
                        DispatchPhase::End,
                        "the run completed without producing a response",
                    )
                })?;
                info!(status = response.status(), "request dispatched");
                Ok(response)
            }
            Err(failure) => self.exception_phase(failure),
        }
    }

    fn run_phases(&mut self) -> Result<(), DispatchError> {
        loop {
            match self.next_phase {
                DispatchPhase::Start => self.start_phase()?,
                DispatchPhase::Route => self.route_phase()?,
                DispatchPhase::PreDispatch => self.pre_dispatch_phase()?,
                DispatchPhase::Dispatch => self.dispatch_phase()?,
                DispatchPhase::PostDispatch => self.post_dispatch_phase()?,
                DispatchPhase::Output => self.output_phase()?,
                DispatchPhase::End => {
                    self.end_phase()?;
                    return Ok(());
                }
            }
        }
    }

    fn enter(&mut self, phase: DispatchPhase, next: DispatchPhase) {
        self.phase = phase;
        self.next_phase = next;
        debug!(phase = %phase, "dispatch phase entered");
    }

    fn start_phase(&mut self) -> Result<(), DispatchError> {
        self.running = true;
        self.enter(DispatchPhase::Start, DispatchPhase::Route);

        {
            let request = self.request.as_ref().ok_or_else(|| {
                DispatchError::invalid_state(
                    DispatchPhase::Start,
                    "a request must be set before run",
                )
            })?;
            self.pipeline.bind_request(request);
        }

        let pipeline = Arc::clone(&self.pipeline);
        pipeline.invoke(HookPoint::OnStart, self)
    }

    fn route_phase(&mut self) -> Result<(), DispatchError> {
        self.enter(DispatchPhase::Route, DispatchPhase::PreDispatch);

        let resolved = {
            let request = self.request.as_ref().ok_or_else(|| {
                DispatchError::invalid_state(DispatchPhase::Route, "no request to route")
            })?;
            let segments = request.path_segments();
            self.resource_map.resolve(&segments)?
        };

        let resource = self.registry.construct(&resolved.handler_id).ok_or_else(|| {
            anyhow::anyhow!(
                "handler '{}' resolved but is not registered",
                resolved.handler_id
            )
        })?;
        info!(handler = %resolved.handler_id, "route resolved");
        self.resource = Some(resource);
        Ok(())
    }

    fn pre_dispatch_phase(&mut self) -> Result<(), DispatchError> {
        self.enter(DispatchPhase::PreDispatch, DispatchPhase::Dispatch);
        let pipeline = Arc::clone(&self.pipeline);
        pipeline.invoke(HookPoint::PreDispatch, self)
    }

    fn dispatch_phase(&mut self) -> Result<(), DispatchError> {
        self.enter(DispatchPhase::Dispatch, DispatchPhase::PostDispatch);

        let resource = self.resource.clone().ok_or_else(|| {
            DispatchError::invalid_state(DispatchPhase::Dispatch, "no resource to dispatch")
        })?;
        let request = self.request.as_ref().ok_or_else(|| {
            DispatchError::invalid_state(DispatchPhase::Dispatch, "no request to dispatch")
        })?;

        let method = request.method().clone();
        let response = if method == Method::GET {
            resource.get(request)
        } else if method == Method::PUT {
            resource.put(request)
        } else if method == Method::POST {
            resource.post(request)
        } else if method == Method::DELETE {
            resource.delete(request)
        } else {
            Err(DispatchError::method_not_allowed(
                method,
                resource.allowed_methods(),
            ))
        }?;

        self.response = Some(response);
        Ok(())
    }

    fn post_dispatch_phase(&mut self) -> Result<(), DispatchError> {
        self.enter(DispatchPhase::PostDispatch, DispatchPhase::Output);
        let pipeline = Arc::clone(&self.pipeline);
        pipeline.invoke(HookPoint::PostDispatch, self)
    }

    fn output_phase(&mut self) -> Result<(), DispatchError> {
        self.enter(DispatchPhase::Output, DispatchPhase::End);

        let default_type = self.config.default_content_type.clone();
        let charset = self.config.charset.clone();
        {
            let response = self.response.as_mut().ok_or_else(|| {
                DispatchError::invalid_state(DispatchPhase::Output, "no response to output")
            })?;
            let mut content_type = response
                .header(HEADER_CONTENT_TYPE)
                .map(str::to_string)
                .unwrap_or(default_type);
            if !content_type.to_ascii_lowercase().contains("charset") {
                content_type.push_str(";charset=");
                content_type.push_str(&charset);
            }
            response.set_header(HEADER_CONTENT_TYPE, content_type);
        }

        if let Some(response) = self.response.as_ref() {
            response.write_to(self.sink.as_mut())?;
        }
        Ok(())
    }

    fn end_phase(&mut self) -> Result<(), DispatchError> {
        self.phase = DispatchPhase::End;
        debug!(phase = %self.phase, "dispatch phase entered");
        let pipeline = Arc::clone(&self.pipeline);
        let outcome = pipeline.invoke(HookPoint::OnEnd, self);
        self.reset_idle();
        outcome
    }

    /// Single interception point for failures: classify once, respond, and
    /// force the machine back to idle.
    fn exception_phase(&mut self, failure: DispatchError) -> Result<Response, DispatchError> {
        error!(phase = %self.phase, error = %failure, "dispatch failed");

        if self.config.surface_errors || failure.is_fatal() {
            self.reset_idle();
            return Err(failure);
        }

        let pipeline = Arc::clone(&self.pipeline);
        if let Err(hook_failure) = pipeline.invoke(HookPoint::OnException(&failure), self) {
            self.reset_idle();
            return Err(hook_failure);
        }

        let response = self.responder.respond(&failure, self.request.as_ref());
        if let Err(write_failure) = response.write_to(self.sink.as_mut()) {
            self.reset_idle();
            return Err(write_failure.into());
        }

        info!(status = response.status(), "failure converted to response");
        self.reset_idle();
        Ok(response)
    }

    fn reset_for_run(&mut self) {
        self.phase = DispatchPhase::Start;
        self.next_phase = DispatchPhase::Start;
        self.response = None;
        self.resource = None;
    }

    fn reset_idle(&mut self) {
        self.phase = DispatchPhase::Start;
        self.next_phase = DispatchPhase::Start;
        self.resource = None;
        self.running = false;
    }

    fn guard_phase(
        &self,
        allowed: &[DispatchPhase],
        message: &str,
    ) -> Result<(), DispatchError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(DispatchError::invalid_state(self.phase, message))
        }
    }
}

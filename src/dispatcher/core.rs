use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use http::Method;
use tracing::{debug, error, info, trace, warn};

use super::diagnosis::diagnose;
use super::options::OptionsResponder;
use crate::bind::{default_resolvers, ArgumentResolver, ArgumentResolvers, RequestBodyAdvice};
use crate::codec::{default_converters, MessageConverter};
use crate::condition::insertion_sort;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, MatchError};
use crate::handler::HandlerMethod;
use crate::mapping::MappingDescriptor;
use crate::registry::{Registration, Registry};
use crate::request::{HttpRequest, MatchScratch, RequestContext};
use crate::response::HttpResponse;
use crate::returns::{default_return_handlers, BodyWriter, ResponseBodyAdvice, ReturnValueHandlers};

/// The registration selected for a request, with its conditions narrowed
/// to what matched and the per-request scratch state.
#[derive(Debug, Clone)]
pub struct HandlerMatch {
    registration: Arc<Registration>,
    descriptor: MappingDescriptor,
    scratch: MatchScratch,
}

impl HandlerMatch {
    #[must_use]
    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<HandlerMethod> {
        self.registration.handler()
    }

    /// The winning descriptor narrowed to the request.
    #[must_use]
    pub fn descriptor(&self) -> &MappingDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn scratch(&self) -> &MatchScratch {
        &self.scratch
    }

    #[must_use]
    pub fn into_scratch(self) -> MatchScratch {
        self.scratch
    }
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    Handler(HandlerMatch),
    /// `OPTIONS` for a mapped path without an explicit `OPTIONS` handler
    Options(OptionsResponder),
}

/// Matches requests against a [`Registry`], binds arguments, invokes the
/// handler and writes its return value.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    resolvers: ArgumentResolvers,
    return_handlers: ReturnValueHandlers,
    slow_lookup: Option<Duration>,
}

impl Dispatcher {
    /// A dispatcher with the default converters, resolvers and return-value
    /// handlers.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::builder(registry).build()
    }

    #[must_use]
    pub fn builder(registry: Arc<Registry>) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn resolvers(&self) -> &ArgumentResolvers {
        &self.resolvers
    }

    #[must_use]
    pub fn return_handlers(&self) -> &ReturnValueHandlers {
        &self.return_handlers
    }

    /// Select the handler for `request`.
    ///
    /// Literal-path registrations are tried first; when none of them
    /// matches, every registration is scanned. Matching candidates are
    /// ranked with [`MappingDescriptor::compare_to`].
    ///
    /// # Errors
    ///
    /// * `AmbiguousMapping` when the two best candidates rank equal
    /// * the no-match diagnosis (`MethodNotAllowed`, `UnsupportedMediaType`,
    ///   `NotAcceptable`, `UnsatisfiedParams`, `NoRouteFound`) otherwise
    pub fn lookup(&self, request: &HttpRequest) -> Result<Lookup, MatchError> {
        let started = Instant::now();
        let snapshot = self.registry.snapshot();
        let path = request.path();

        // L1: direct-path hits
        let mut candidates = matching(snapshot.direct(path), request);
        // L2: full scan
        if candidates.is_empty() {
            trace!(path = %path, "No direct match, scanning all mappings");
            candidates = matching(snapshot.registrations(), request);
        }

        let result = if candidates.is_empty() {
            // L3: no-match diagnosis
            diagnose(snapshot.registrations(), request).map(Lookup::Options)
        } else {
            // L4: rank
            self.best_match(candidates, request).map(Lookup::Handler)
        };

        let elapsed = started.elapsed();
        if let Some(threshold) = self.slow_lookup.filter(|t| elapsed > *t) {
            warn!(
                method = %request.method(),
                path = %path,
                elapsed_us = elapsed.as_micros() as u64,
                threshold_us = threshold.as_micros() as u64,
                mappings = snapshot.registrations().len(),
                "Slow handler lookup"
            );
        }
        result
    }

    fn best_match(
        &self,
        mut candidates: Vec<(Arc<Registration>, MappingDescriptor)>,
        request: &HttpRequest,
    ) -> Result<HandlerMatch, MatchError> {
        if candidates.len() > 1 {
            insertion_sort(&mut candidates, |a, b| a.1.compare_to(&b.1, request));
            let (best, second) = (&candidates[0], &candidates[1]);
            if best.1.compare_to(&second.1, request) == std::cmp::Ordering::Equal {
                error!(
                    method = %request.method(),
                    path = %request.path(),
                    candidate_a = %best.0,
                    candidate_b = %second.0,
                    "Ambiguous handler methods"
                );
                return Err(MatchError::AmbiguousMapping {
                    path: request.path().to_string(),
                    candidate_a: best.0.to_string(),
                    candidate_b: second.0.to_string(),
                });
            }
        }
        let (registration, descriptor) = candidates.swap_remove(0);
        let scratch = scratch_for(&descriptor, request);
        debug!(
            method = %request.method(),
            path = %request.path(),
            handler = %registration.handler().id(),
            pattern = %scratch.best_pattern,
            "Matched handler"
        );
        Ok(HandlerMatch {
            registration,
            descriptor,
            scratch,
        })
    }

    /// Look up, bind, invoke and write the response.
    ///
    /// Handler panics are caught and reported as `DispatchError::Handler`.
    /// For `HEAD` requests served by a `GET` mapping the body is dropped and
    /// the headers kept.
    pub fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, DispatchError> {
        // D1: lookup
        let matched = match self.lookup(request)? {
            Lookup::Options(responder) => return Ok(responder.to_response()),
            Lookup::Handler(matched) => matched,
        };
        let handler = Arc::clone(matched.handler());
        let context = RequestContext::new(request, matched.into_scratch());

        // D2: bind arguments
        let arguments = self.resolvers.resolve_arguments(&handler, &context)?;

        // D3: invoke
        let invoked = Instant::now();
        let value = match catch_unwind(AssertUnwindSafe(|| handler.invoke(&arguments))) {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(handler = %handler.id(), error = %e, "Handler returned an error");
                return Err(DispatchError::Handler(e));
            }
            Err(panic) => {
                let panic_message = panic_message(panic.as_ref());
                error!(
                    handler = %handler.id(),
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                return Err(DispatchError::Handler(anyhow!("handler panicked: {panic_message}")));
            }
        };
        trace!(
            handler = %handler.id(),
            execution_time_us = invoked.elapsed().as_micros() as u64,
            "Handler execution complete"
        );

        // D4: write the return value
        let mut response = HttpResponse::new();
        self.return_handlers
            .handle_return_value(value, handler.return_type(), &context, &mut response)?;

        if request.method() == Method::HEAD && !response.is_streaming() {
            response.body_mut().clear();
        }
        Ok(response)
    }

    /// [`dispatch`](Self::dispatch), with failures rendered as error
    /// responses.
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    error!(
                        method = %request.method(),
                        path = %request.path(),
                        status = status.as_u16(),
                        error = %e,
                        "Request failed"
                    );
                } else {
                    debug!(
                        method = %request.method(),
                        path = %request.path(),
                        status = status.as_u16(),
                        error = %e,
                        "Request rejected"
                    );
                }
                e.to_response()
            }
        }
    }
}

fn matching(
    registrations: &[Arc<Registration>],
    request: &HttpRequest,
) -> Vec<(Arc<Registration>, MappingDescriptor)> {
    registrations
        .iter()
        .filter_map(|r| {
            r.descriptor()
                .matching_condition(request)
                .map(|narrowed| (Arc::clone(r), narrowed))
        })
        .collect()
}

fn scratch_for(descriptor: &MappingDescriptor, request: &HttpRequest) -> MatchScratch {
    let path = request.path();
    let best_pattern = descriptor
        .patterns()
        .first()
        .map_or_else(|| path.to_string(), |p| (*p).to_string());
    let uri_variables = descriptor
        .path_condition()
        .extract(&best_pattern, path)
        .map(|m| m.variables)
        .unwrap_or_default();
    MatchScratch {
        lookup_path: path.to_string(),
        best_pattern,
        uri_variables,
        producible_media_types: descriptor.produces_condition().producible_media_types(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Assembles a [`Dispatcher`].
///
/// ```text
/// let dispatcher = Dispatcher::builder(Arc::clone(&registry))
///     .config(DispatchConfig::from_env())
///     .argument_resolver(Arc::new(TenantResolver))
///     .response_body_advice(Arc::new(Envelope))
///     .build();
/// ```
#[derive(Debug)]
pub struct DispatcherBuilder {
    registry: Arc<Registry>,
    config: DispatchConfig,
    converters: Vec<Arc<dyn MessageConverter>>,
    resolvers: Vec<Arc<dyn ArgumentResolver>>,
    request_advice: Vec<Arc<dyn RequestBodyAdvice>>,
    response_advice: Vec<Arc<dyn ResponseBodyAdvice>>,
}

impl DispatcherBuilder {
    fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: DispatchConfig::default(),
            converters: default_converters(),
            resolvers: Vec::new(),
            request_advice: Vec::new(),
            response_advice: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the message converters.
    #[must_use]
    pub fn converters(mut self, converters: Vec<Arc<dyn MessageConverter>>) -> Self {
        self.converters = converters;
        self
    }

    /// Append a message converter after the current ones.
    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn MessageConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Add a custom argument resolver; custom resolvers run after the
    /// built-in ones and before the catch-all resolvers.
    #[must_use]
    pub fn argument_resolver(mut self, resolver: Arc<dyn ArgumentResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    #[must_use]
    pub fn request_body_advice(mut self, advice: Arc<dyn RequestBodyAdvice>) -> Self {
        self.request_advice.push(advice);
        self
    }

    #[must_use]
    pub fn response_body_advice(mut self, advice: Arc<dyn ResponseBodyAdvice>) -> Self {
        self.response_advice.push(advice);
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher {
        let negotiator = Arc::clone(&self.registry.options().negotiator);
        let writer = BodyWriter::new(self.converters.clone(), self.response_advice, negotiator);
        let resolvers = ArgumentResolvers::new(default_resolvers(
            self.converters,
            self.request_advice,
            self.resolvers,
        ));
        let resolvers = if self.config.resolver_cache {
            resolvers
        } else {
            resolvers.without_cache()
        };
        info!(
            mappings = self.registry.len(),
            resolvers = resolvers.len(),
            resolver_cache = self.config.resolver_cache,
            "Dispatcher ready"
        );
        Dispatcher {
            registry: self.registry,
            resolvers,
            return_handlers: default_return_handlers(&writer),
            slow_lookup: self.config.slow_lookup_threshold(),
        }
    }
}

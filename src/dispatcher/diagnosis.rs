//! Why nothing matched.
//!
//! Each registration whose path matches is evaluated condition by
//! condition. The verdict narrows cumulatively: methods, then consumes among
//! the method matches, then produces among those, then params.

use http::Method;
use std::sync::Arc;
use tracing::debug;

use super::options::OptionsResponder;
use crate::condition::RequestCondition;
use crate::error::MatchError;
use crate::media::MediaType;
use crate::registry::Registration;
use crate::request::HttpRequest;

/// Per-condition verdicts for one registration whose path matched.
struct PartialMatch<'a> {
    registration: &'a Registration,
    methods: bool,
    consumes: bool,
    produces: bool,
    params: bool,
}

impl<'a> PartialMatch<'a> {
    fn new(registration: &'a Registration, request: &HttpRequest) -> Option<Self> {
        let descriptor = registration.descriptor();
        descriptor.path_condition().matching_condition(request.path())?;
        Some(Self {
            registration,
            methods: descriptor.methods_condition().matching_condition(request).is_some(),
            consumes: descriptor.consumes_condition().matching_condition(request).is_some(),
            produces: descriptor.produces_condition().matching_condition(request).is_some(),
            params: descriptor.params_condition().matching_condition(request).is_some(),
        })
    }

    fn through_consumes(&self) -> bool {
        self.methods && self.consumes
    }

    fn through_produces(&self) -> bool {
        self.through_consumes() && self.produces
    }
}

fn push_unique<T: PartialEq>(into: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Classify a request no registration fully matched.
///
/// `Ok` only for an `OPTIONS` request whose path is mapped without an
/// explicit `OPTIONS` handler.
pub(crate) fn diagnose(
    registrations: &[Arc<Registration>],
    request: &HttpRequest,
) -> Result<OptionsResponder, MatchError> {
    let partial: Vec<PartialMatch<'_>> = registrations
        .iter()
        .filter_map(|r| PartialMatch::new(r, request))
        .collect();

    if partial.is_empty() {
        return Err(MatchError::NoRouteFound {
            method: request.method().clone(),
            path: request.path().to_string(),
        });
    }

    if !partial.iter().any(|m| m.methods) {
        let mut declared: Vec<Method> = Vec::new();
        for m in &partial {
            push_unique(&mut declared, m.registration.descriptor().methods().iter().cloned());
        }
        if request.method() == Method::OPTIONS {
            let mut accept_patch: Vec<MediaType> = Vec::new();
            for m in &partial {
                let descriptor = m.registration.descriptor();
                if descriptor.methods().contains(&Method::PATCH) {
                    push_unique(
                        &mut accept_patch,
                        descriptor.consumes_condition().consumable_media_types(),
                    );
                }
            }
            let responder = OptionsResponder::new(declared, accept_patch);
            debug!(path = %request.path(), allow = %responder.allow_header(), "Synthesized OPTIONS response");
            return Ok(responder);
        }
        crate::condition::sort_methods(&mut declared);
        return Err(MatchError::MethodNotAllowed {
            method: request.method().clone(),
            allowed: declared,
        });
    }

    if !partial.iter().any(PartialMatch::through_consumes) {
        let mut supported: Vec<MediaType> = Vec::new();
        for m in partial.iter().filter(|m| m.methods) {
            push_unique(
                &mut supported,
                m.registration.descriptor().consumes_condition().consumable_media_types(),
            );
        }
        return Err(MatchError::UnsupportedMediaType {
            content_type: request.header(http::header::CONTENT_TYPE.as_str()).map(str::to_string),
            supported,
        });
    }

    if !partial.iter().any(PartialMatch::through_produces) {
        let mut producible: Vec<MediaType> = Vec::new();
        for m in partial.iter().filter(|m| m.through_consumes()) {
            push_unique(
                &mut producible,
                m.registration.descriptor().produces_condition().producible_media_types(),
            );
        }
        return Err(MatchError::NotAcceptable { producible });
    }

    if !partial.iter().any(|m| m.through_produces() && m.params) {
        let mut failing: Vec<String> = Vec::new();
        for m in partial.iter().filter(|m| m.through_produces()) {
            push_unique(
                &mut failing,
                m.registration.descriptor().params_condition().failing_expressions(request),
            );
        }
        let actual = request
            .parameter_map()
            .into_iter()
            .map(|(name, values)| (name.to_string(), values.into_iter().map(str::to_string).collect()))
            .collect();
        return Err(MatchError::UnsatisfiedParams { failing, actual });
    }

    // headers or a custom condition failed
    Err(MatchError::NoRouteFound {
        method: request.method().clone(),
        path: request.path().to_string(),
    })
}

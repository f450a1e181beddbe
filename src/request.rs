//! # Request Module
//!
//! The host hands the dispatcher an already-parsed [`HttpRequest`]: method,
//! path, headers, body and (optionally) a [`Session`]. Query parameters and
//! `application/x-www-form-urlencoded` bodies are decoded once, when the
//! request is built.
//!
//! [`MatchScratch`] is the per-request state the dispatcher fills after
//! picking a handler (best pattern, URI variables, producible media types);
//! argument resolvers and return-value handlers read it through
//! [`RequestContext`] and never recompute it.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use once_cell::sync::OnceCell;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::media::{ContentNegotiator, InvalidMediaType, MediaType};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Names are `Arc<str>` so that names coming from route templates clone in
/// O(1); values are per-request data. Repeated names are allowed (multi-valued
/// query parameters).
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Methods whose requests are expected to carry a body.
pub const BODY_METHODS: [Method; 3] = [Method::POST, Method::PUT, Method::PATCH];

/// Server-side session state shared by the requests of one client.
#[derive(Debug, Default)]
pub struct Session {
    id: String,
    attributes: RwLock<HashMap<String, Value>>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Clone of the attribute value, if set.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.read().ok()?.get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: Value) {
        if let Ok(mut attributes) = self.attributes.write() {
            attributes.insert(name.into(), value);
        }
    }

    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.attributes.write().ok()?.remove(name)
    }
}

/// An inbound request as seen by the dispatch core.
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query: Option<String>,
    parameters: ParamVec,
    headers: HeaderMap,
    body: Vec<u8>,
    session: Option<Arc<Session>>,
    acceptable: OnceCell<Result<Vec<MediaType>, InvalidMediaType>>,
}

impl HttpRequest {
    /// Start building a request. `uri` is a path with an optional query
    /// string (`/items?page=2`).
    #[must_use]
    pub fn builder(method: Method, uri: &str) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, uri)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path used for matching (no query string, not decoded).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid visible ASCII.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// All request parameters: query string first, then form body fields.
    #[must_use]
    pub fn parameters(&self) -> &ParamVec {
        &self.parameters
    }

    /// First value of a request parameter.
    #[inline]
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn parameter_values(&self, name: &str) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|(k, _)| k.as_ref() == name)
    }

    /// Parameters grouped by name, in first-seen order.
    #[must_use]
    pub fn parameter_map(&self) -> Vec<(&str, Vec<&str>)> {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (name, value) in &self.parameters {
            match grouped.iter_mut().find(|(k, _)| *k == name.as_ref()) {
                Some((_, values)) => values.push(value.as_str()),
                None => grouped.push((name.as_ref(), vec![value.as_str()])),
            }
        }
        grouped
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the request announces or carries a body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        let declared_length = self
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0);
        declared_length || self.headers.contains_key(TRANSFER_ENCODING) || !self.body.is_empty()
    }

    /// The parsed `Content-Type`, `None` when the header is absent.
    #[must_use]
    pub fn content_type(&self) -> Option<Result<MediaType, InvalidMediaType>> {
        self.header(CONTENT_TYPE.as_str()).map(MediaType::parse)
    }

    /// Cookie value by name, parsed from the `Cookie` header(s).
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.header_values(COOKIE.as_str())
            .into_iter()
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let key = parts.next()?.trim();
                let value = parts.next().unwrap_or("").trim();
                Some((key, value))
            })
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    #[must_use]
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Acceptable media types, resolved once per request.
    ///
    /// The first caller's negotiator wins; every condition of one registry
    /// shares the same negotiator, so the cached result is consistent.
    pub fn acceptable_media_types(
        &self,
        negotiator: &dyn ContentNegotiator,
    ) -> Result<&[MediaType], InvalidMediaType> {
        self.acceptable
            .get_or_init(|| negotiator.resolve_acceptable_types(self))
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }
}

/// Builder for [`HttpRequest`]; used by hosts and tests.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
    session: Option<Arc<Session>>,
}

impl HttpRequestBuilder {
    fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Vec::new(),
            session: None,
        }
    }

    /// Append a header. Invalid names or values are logged and skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid request header"),
        }
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpRequest {
        let mut parameters = ParamVec::new();
        if let Some(query) = &self.query {
            parameters.extend(
                url::form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned())),
            );
        }
        let is_form = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| MediaType::parse(v).ok())
            .is_some_and(|ct| MediaType::application_form_urlencoded().includes(&ct));
        if is_form && !self.body.is_empty() {
            parameters.extend(
                url::form_urlencoded::parse(&self.body)
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned())),
            );
        }
        HttpRequest {
            method: self.method,
            path: self.path,
            query: self.query,
            parameters,
            headers: self.headers,
            body: self.body,
            session: self.session,
            acceptable: OnceCell::new(),
        }
    }
}

/// State attached to a request once a handler has been selected.
#[derive(Debug, Clone, Default)]
pub struct MatchScratch {
    /// Path the lookup ran against
    pub lookup_path: String,
    /// The pattern of the winning mapping that matched the path
    pub best_pattern: String,
    /// Decoded URI template variables of the best pattern
    pub uri_variables: ParamVec,
    /// Producible media types of the winning mapping (empty when it declares none)
    pub producible_media_types: Vec<MediaType>,
}

impl MatchScratch {
    /// URI variable by name. Last write wins when a template repeats a name.
    #[inline]
    #[must_use]
    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Borrowed request plus its match scratch, handed to resolvers and
/// return-value handlers.
#[derive(Debug)]
pub struct RequestContext<'a> {
    request: &'a HttpRequest,
    scratch: MatchScratch,
}

impl<'a> RequestContext<'a> {
    #[must_use]
    pub fn new(request: &'a HttpRequest, scratch: MatchScratch) -> Self {
        Self { request, scratch }
    }

    #[must_use]
    pub fn request(&self) -> &'a HttpRequest {
        self.request
    }

    #[must_use]
    pub fn scratch(&self) -> &MatchScratch {
        &self.scratch
    }
}

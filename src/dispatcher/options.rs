use http::header::{ALLOW, CONTENT_LENGTH};
use http::{Method, StatusCode};

use crate::condition::sort_methods;
use crate::media::MediaType;
use crate::response::HttpResponse;

const ACCEPT_PATCH: &str = "accept-patch";

/// Answer to an `OPTIONS` request for a path no mapping declares `OPTIONS`
/// on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsResponder {
    allow: Vec<Method>,
    accept_patch: Vec<MediaType>,
}

impl OptionsResponder {
    /// Build from the methods declared by the mappings of a path.
    ///
    /// Nothing declared means every method but `TRACE`; otherwise the
    /// declared ones plus `HEAD` when `GET` is there, plus `OPTIONS`.
    pub(crate) fn new(declared: Vec<Method>, accept_patch: Vec<MediaType>) -> Self {
        let mut allow = if declared.is_empty() {
            vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ]
        } else {
            let mut allow = declared;
            if allow.contains(&Method::GET) && !allow.contains(&Method::HEAD) {
                allow.push(Method::HEAD);
            }
            if !allow.contains(&Method::OPTIONS) {
                allow.push(Method::OPTIONS);
            }
            allow
        };
        sort_methods(&mut allow);
        Self { allow, accept_patch }
    }

    #[must_use]
    pub fn allow(&self) -> &[Method] {
        &self.allow
    }

    /// Media types accepted by `PATCH` mappings of the path.
    #[must_use]
    pub fn accept_patch(&self) -> &[MediaType] {
        &self.accept_patch
    }

    /// `Allow` header value, e.g. `GET, HEAD, OPTIONS`.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.allow
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `200 OK`, no body, `Allow` and (when known) `Accept-Patch`.
    #[must_use]
    pub fn to_response(&self) -> HttpResponse {
        let mut response = HttpResponse::new();
        response.set_status(StatusCode::OK);
        response.set_header(ALLOW.as_str(), &self.allow_header());
        if !self.accept_patch.is_empty() {
            let types: Vec<String> = self.accept_patch.iter().map(ToString::to_string).collect();
            response.set_header(ACCEPT_PATCH, &types.join(", "));
        }
        response.set_header(CONTENT_LENGTH.as_str(), "0");
        response
    }
}

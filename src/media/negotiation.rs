use std::fmt;

use http::header::ACCEPT;

use super::core::{sort_by_specificity_and_quality, InvalidMediaType, MediaType};
use crate::request::HttpRequest;

/// Strategy that determines which media types a request accepts.
///
/// The returned list is ordered best-first. Implementations must not return
/// an empty list; "no preference" is expressed as `[*/*]`.
pub trait ContentNegotiator: Send + Sync + fmt::Debug {
    fn resolve_acceptable_types(
        &self,
        request: &HttpRequest,
    ) -> Result<Vec<MediaType>, InvalidMediaType>;
}

/// Reads the `Accept` header(s). Absent or blank headers mean `*/*`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderContentNegotiator;

impl ContentNegotiator for HeaderContentNegotiator {
    fn resolve_acceptable_types(
        &self,
        request: &HttpRequest,
    ) -> Result<Vec<MediaType>, InvalidMediaType> {
        let mut types = Vec::new();
        for value in request.headers().get_all(ACCEPT) {
            let raw = value.to_str().map_err(|_| InvalidMediaType {
                input: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                reason: "header value is not visible ASCII",
            })?;
            types.extend(MediaType::parse_list(raw)?);
        }
        if types.is_empty() {
            return Ok(vec![MediaType::all()]);
        }
        sort_by_specificity_and_quality(&mut types);
        Ok(types)
    }
}

/// Always answers with a fixed list, ignoring the request.
#[derive(Debug, Clone)]
pub struct FixedContentNegotiator {
    types: Vec<MediaType>,
}

impl FixedContentNegotiator {
    #[must_use]
    pub fn new(mut types: Vec<MediaType>) -> Self {
        if types.is_empty() {
            types.push(MediaType::all());
        }
        Self { types }
    }
}

impl ContentNegotiator for FixedContentNegotiator {
    fn resolve_acceptable_types(
        &self,
        _request: &HttpRequest,
    ) -> Result<Vec<MediaType>, InvalidMediaType> {
        Ok(self.types.clone())
    }
}

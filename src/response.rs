//! # Response Module
//!
//! The response the dispatcher hands back to the host: status, headers and
//! either a buffered body or, for streaming return values, a channel of
//! frames the host drains until it closes.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use std::sync::mpsc;
use tracing::warn;

use crate::media::MediaType;

/// Frames of a streaming response body.
pub type BodyStream = mpsc::Receiver<Vec<u8>>;

/// Outbound response being assembled by return-value handlers.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    stream: Option<BodyStream>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            stream: None,
        }
    }

    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut response = Self::new();
        response.status = status;
        response.set_header(CONTENT_TYPE.as_str(), "application/json");
        response.body = body.to_string().into_bytes();
        response
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set (replace) a header. Invalid names or values are logged and
    /// skipped.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }

    /// The `Content-Type` already set on the response, if it parses.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.header(CONTENT_TYPE.as_str())
            .and_then(|v| MediaType::parse(v).ok())
    }

    pub fn set_content_type(&mut self, media_type: &MediaType) {
        self.set_header(CONTENT_TYPE.as_str(), &media_type.remove_quality().to_string());
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        &mut self.body
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn attach_stream(&mut self, stream: BodyStream) {
        self.stream = Some(stream);
    }

    /// Take the frame channel of a streaming response. Frames arrive until
    /// the emitter completes or times out.
    pub fn take_stream(&mut self) -> Option<BodyStream> {
        self.stream.take()
    }
}

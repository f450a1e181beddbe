use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Status, headers and an optional body returned from a handler.
///
/// A `Content-Type` header set here is treated as preset: the body is
/// written with exactly that type or not at all.
#[derive(Debug, Clone)]
pub struct ResponseEntity {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl Default for ResponseEntity {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl ResponseEntity {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// Add a header. Invalid names or values are logged and skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response entity header"),
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Split into parts.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<Value>) {
        (self.status, self.headers, self.body)
    }
}

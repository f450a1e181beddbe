//! # Error Module
//!
//! Typed failures of every dispatch stage. Matching and binding errors are
//! never swallowed: they propagate to the host as [`DispatchError`], which
//! knows its HTTP status and can render itself as a JSON error response.

use http::header::{ACCEPT, ALLOW};
use http::{Method, StatusCode};
use serde_json::json;
use std::fmt;

use crate::condition::PathStrategy;
use crate::media::{InvalidMediaType, MediaType};
use crate::pattern::PatternError;
use crate::response::HttpResponse;

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A mapping descriptor could not be built or combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    InvalidPattern(PatternError),
    /// A params/headers expression that does not parse
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },
    InvalidMediaType(InvalidMediaType),
    /// Both path strategies in one descriptor, or combining across them
    StrategyMismatch {
        expected: PathStrategy,
        found: PathStrategy,
    },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::InvalidPattern(e) => write!(f, "{e}"),
            DescriptorError::InvalidExpression { expression, reason } => {
                write!(f, "invalid expression '{expression}': {reason}")
            }
            DescriptorError::InvalidMediaType(e) => write!(f, "{e}"),
            DescriptorError::StrategyMismatch { expected, found } => write!(
                f,
                "path strategy mismatch: expected {expected} patterns, found {found} patterns"
            ),
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DescriptorError::InvalidPattern(e) => Some(e),
            DescriptorError::InvalidMediaType(e) => Some(e),
            _ => None,
        }
    }
}

/// A registration the registry refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The descriptor uses the other path strategy than the registry
    StrategyMismatch {
        descriptor: String,
        expected: PathStrategy,
        found: PathStrategy,
    },
    /// The descriptor is already mapped to a different handler
    DuplicateMapping {
        descriptor: String,
        existing: String,
        attempted: String,
    },
    InvalidDescriptor(DescriptorError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::StrategyMismatch {
                descriptor,
                expected,
                found,
            } => write!(
                f,
                "mapping {descriptor} uses {found} patterns but the registry is configured for {expected} patterns"
            ),
            RegistrationError::DuplicateMapping {
                descriptor,
                existing,
                attempted,
            } => write!(
                f,
                "ambiguous mapping: cannot map '{attempted}' to {descriptor}, \
                 '{existing}' is already mapped there"
            ),
            RegistrationError::InvalidDescriptor(e) => write!(f, "invalid mapping: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<DescriptorError> for RegistrationError {
    fn from(e: DescriptorError) -> Self {
        RegistrationError::InvalidDescriptor(e)
    }
}

/// Why no handler was selected for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// No mapping matches the path
    NoRouteFound { method: Method, path: String },
    MethodNotAllowed {
        method: Method,
        allowed: Vec<Method>,
    },
    UnsupportedMediaType {
        content_type: Option<String>,
        supported: Vec<MediaType>,
    },
    NotAcceptable { producible: Vec<MediaType> },
    UnsatisfiedParams {
        failing: Vec<String>,
        actual: Vec<(String, Vec<String>)>,
    },
    /// Two mappings match equally well; a configuration error
    AmbiguousMapping {
        path: String,
        candidate_a: String,
        candidate_b: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NoRouteFound { method, path } => {
                write!(f, "no handler found for {method} {path}")
            }
            MatchError::MethodNotAllowed { method, allowed } => write!(
                f,
                "request method '{method}' is not supported, allowed: [{}]",
                join(allowed)
            ),
            MatchError::UnsupportedMediaType {
                content_type,
                supported,
            } => write!(
                f,
                "content type '{}' is not supported, supported: [{}]",
                content_type.as_deref().unwrap_or(""),
                join(supported)
            ),
            MatchError::NotAcceptable { producible } => write!(
                f,
                "no acceptable representation, producible: [{}]",
                join(producible)
            ),
            MatchError::UnsatisfiedParams { failing, .. } => write!(
                f,
                "parameter conditions \"{}\" not met for actual request parameters",
                failing.join(", ")
            ),
            MatchError::AmbiguousMapping {
                path,
                candidate_a,
                candidate_b,
            } => write!(
                f,
                "ambiguous handler methods mapped for '{path}': {{{candidate_a}, {candidate_b}}}"
            ),
        }
    }
}

impl std::error::Error for MatchError {}

/// Why an argument could not be bound.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingErrorKind {
    MissingPathVariable,
    MissingRequestParam,
    MissingHeader,
    MissingCookie,
    MissingSessionAttribute,
    /// A required request body is absent
    BodyMissing,
    /// The raw value does not convert to the declared type
    TypeMismatch { value: String, reason: String },
    /// A converter failed to read the body
    UnreadableBody { reason: String },
    /// No converter reads the body's content type
    UnsupportedMediaType {
        content_type: String,
        supported: Vec<MediaType>,
    },
    /// No resolver supports the parameter
    NoResolver,
}

/// An argument binding failure: the offending parameter, its declared type
/// and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingError {
    pub parameter: String,
    pub target_type: String,
    pub kind: BindingErrorKind,
}

impl BindingError {
    #[must_use]
    pub fn new(parameter: &str, target_type: impl fmt::Display, kind: BindingErrorKind) -> Self {
        Self {
            parameter: parameter.to_string(),
            target_type: target_type.to_string(),
            kind,
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (parameter, target) = (&self.parameter, &self.target_type);
        match &self.kind {
            BindingErrorKind::MissingPathVariable => write!(
                f,
                "missing URI template variable '{parameter}' for method parameter of type {target}"
            ),
            BindingErrorKind::MissingRequestParam => write!(
                f,
                "required request parameter '{parameter}' for method parameter type {target} is not present"
            ),
            BindingErrorKind::MissingHeader => write!(
                f,
                "required request header '{parameter}' for method parameter type {target} is not present"
            ),
            BindingErrorKind::MissingCookie => write!(
                f,
                "required cookie '{parameter}' for method parameter type {target} is not present"
            ),
            BindingErrorKind::MissingSessionAttribute => write!(
                f,
                "missing session attribute '{parameter}' of type {target}"
            ),
            BindingErrorKind::BodyMissing => write!(
                f,
                "required request body is missing (parameter '{parameter}' of type {target})"
            ),
            BindingErrorKind::TypeMismatch { value, reason } => write!(
                f,
                "failed to convert value '{value}' of parameter '{parameter}' to {target}: {reason}"
            ),
            BindingErrorKind::UnreadableBody { reason } => write!(
                f,
                "could not read request body into parameter '{parameter}' of type {target}: {reason}"
            ),
            BindingErrorKind::UnsupportedMediaType {
                content_type,
                supported,
            } => write!(
                f,
                "content type '{content_type}' not supported for parameter '{parameter}', supported: [{}]",
                join(supported)
            ),
            BindingErrorKind::NoResolver => write!(
                f,
                "no suitable resolver for argument '{parameter}' of type {target}"
            ),
        }
    }
}

impl std::error::Error for BindingError {}

/// A return value could not be written.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValueError {
    /// Negotiation found no type both acceptable and producible
    NotAcceptable { producible: Vec<MediaType> },
    /// The selected or preset content type has no writer
    NotWritable {
        content_type: MediaType,
        value_type: String,
    },
    /// A converter failed while writing
    WriteFailed { converter: String, reason: String },
    /// No return-value handler supports the declared return type
    UnsupportedReturnType { return_type: String },
}

impl fmt::Display for ReturnValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValueError::NotAcceptable { producible } => write!(
                f,
                "could not find acceptable representation, producible: [{}]",
                join(producible)
            ),
            ReturnValueError::NotWritable {
                content_type,
                value_type,
            } => write!(
                f,
                "no converter for [{value_type}] with preset content type '{content_type}'"
            ),
            ReturnValueError::WriteFailed { converter, reason } => {
                write!(f, "converter {converter} failed to write: {reason}")
            }
            ReturnValueError::UnsupportedReturnType { return_type } => {
                write!(f, "unknown return value type: {return_type}")
            }
        }
    }
}

impl std::error::Error for ReturnValueError {}

/// Any failure of [`crate::dispatcher::Dispatcher::dispatch`].
#[derive(Debug)]
pub enum DispatchError {
    Match(MatchError),
    Binding(BindingError),
    /// The handler itself returned an error
    Handler(anyhow::Error),
    ReturnValue(ReturnValueError),
}

impl DispatchError {
    /// HTTP status the host should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Match(e) => match e {
                MatchError::NoRouteFound { .. } => StatusCode::NOT_FOUND,
                MatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
                MatchError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                MatchError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
                MatchError::UnsatisfiedParams { .. } => StatusCode::BAD_REQUEST,
                MatchError::AmbiguousMapping { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DispatchError::Binding(e) => match e.kind {
                BindingErrorKind::MissingPathVariable | BindingErrorKind::NoResolver => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                BindingErrorKind::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            },
            DispatchError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::ReturnValue(e) => match e {
                ReturnValueError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Render as a JSON error response (`Allow` on 405, `Accept` on 415).
    #[must_use]
    pub fn to_response(&self) -> HttpResponse {
        let status = self.status();
        let mut body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "message": self.to_string(),
        });
        let mut allow = None;
        let mut accept = None;
        match self {
            DispatchError::Match(MatchError::MethodNotAllowed { allowed, .. }) => {
                let methods: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                body["allowed_methods"] = json!(methods);
                allow = Some(methods.join(", "));
            }
            DispatchError::Match(MatchError::UnsupportedMediaType { supported, .. })
            | DispatchError::Binding(BindingError {
                kind: BindingErrorKind::UnsupportedMediaType { supported, .. },
                ..
            }) => {
                let types: Vec<String> = supported.iter().map(ToString::to_string).collect();
                body["supported_types"] = json!(types);
                accept = Some(types.join(", "));
            }
            DispatchError::Match(MatchError::NotAcceptable { producible })
            | DispatchError::ReturnValue(ReturnValueError::NotAcceptable { producible }) => {
                let types: Vec<String> = producible.iter().map(ToString::to_string).collect();
                body["producible_types"] = json!(types);
            }
            DispatchError::Match(MatchError::UnsatisfiedParams { failing, .. }) => {
                body["failing_expressions"] = json!(failing);
            }
            DispatchError::Binding(e) => {
                body["parameter"] = json!(e.parameter);
            }
            _ => {}
        }
        let mut response = HttpResponse::json(status, &body);
        if let Some(allow) = allow.filter(|a| !a.is_empty()) {
            response.set_header(ALLOW.as_str(), &allow);
        }
        if let Some(accept) = accept.filter(|a| !a.is_empty()) {
            response.set_header(ACCEPT.as_str(), &accept);
        }
        response
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Match(e) => write!(f, "{e}"),
            DispatchError::Binding(e) => write!(f, "{e}"),
            DispatchError::Handler(e) => write!(f, "handler failed: {e}"),
            DispatchError::ReturnValue(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Match(e) => Some(e),
            DispatchError::Binding(e) => Some(e),
            DispatchError::Handler(e) => Some(&**e),
            DispatchError::ReturnValue(e) => Some(e),
        }
    }
}

impl From<MatchError> for DispatchError {
    fn from(e: MatchError) -> Self {
        DispatchError::Match(e)
    }
}

impl From<BindingError> for DispatchError {
    fn from(e: BindingError) -> Self {
        DispatchError::Binding(e)
    }
}

impl From<ReturnValueError> for DispatchError {
    fn from(e: ReturnValueError) -> Self {
        DispatchError::ReturnValue(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_response() {
        let error = DispatchError::from(MatchError::MethodNotAllowed {
            method: Method::DELETE,
            allowed: vec![Method::GET, Method::POST],
        });
        assert_eq!(error.status(), StatusCode::METHOD_NOT_ALLOWED);
        let response = error.to_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, POST"));
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["allowed_methods"], json!(["GET", "POST"]));
        assert_eq!(body["status"], json!(405));
    }

    #[test]
    fn test_unsupported_media_type_response() {
        let error = DispatchError::from(MatchError::UnsupportedMediaType {
            content_type: Some("application/xml".to_string()),
            supported: vec![MediaType::application_json()],
        });
        let response = error.to_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.header("accept"), Some("application/json"));
    }

    #[test]
    fn test_binding_statuses() {
        let missing = DispatchError::from(BindingError::new(
            "page",
            "Integer",
            BindingErrorKind::MissingRequestParam,
        ));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let path = DispatchError::from(BindingError::new(
            "id",
            "String",
            BindingErrorKind::MissingPathVariable,
        ));
        assert_eq!(path.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(missing.to_string().contains("'page'"));
    }

    #[test]
    fn test_not_writable_is_server_error() {
        let error = DispatchError::from(ReturnValueError::NotWritable {
            content_type: MediaType::application_xml(),
            value_type: "Json".to_string(),
        });
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = DispatchError::from(ReturnValueError::NotAcceptable { producible: vec![] });
        assert_eq!(error.status(), StatusCode::NOT_ACCEPTABLE);
    }
}

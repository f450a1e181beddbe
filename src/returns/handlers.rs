use http::header::CACHE_CONTROL;
use http::HeaderMap;
use serde_json::Value;
use std::fmt;
use std::sync::{mpsc, Arc};
use tracing::{debug, warn};

use super::writer::BodyWriter;
use crate::error::ReturnValueError;
use crate::handler::{ReturnType, ReturnValue, ValueType};
use crate::media::MediaType;
use crate::request::RequestContext;
use crate::response::HttpResponse;

/// Strategy that turns a handler's return value into response state.
pub trait ReturnValueHandler: Send + Sync + fmt::Debug {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool;

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError>;
}

fn unexpected(value: &ReturnValue, return_type: &ReturnType) -> ReturnValueError {
    let actual = match value {
        ReturnValue::Unit => "void",
        ReturnValue::Body(_) => "body",
        ReturnValue::Entity(_) => "ResponseEntity",
        ReturnValue::Headers(_) => "HttpHeaders",
        ReturnValue::Emitter(_) => "ResponseBodyEmitter",
    };
    ReturnValueError::UnsupportedReturnType {
        return_type: format!("{actual} returned from a handler declared as {return_type}"),
    }
}

fn copy_headers(headers: HeaderMap, response: &mut HttpResponse) {
    let mut last = None;
    for (name, value) in headers {
        // `None` names continue the previous name's values
        let name = match name {
            Some(name) => {
                response.headers_mut().remove(&name);
                last = Some(name.clone());
                name
            }
            None => match &last {
                Some(name) => name.clone(),
                None => continue,
            },
        };
        response.headers_mut().append(name, value);
    }
}

/// `ResponseBodyEmitter` return values: streaming responses.
#[derive(Debug, Clone)]
pub struct EmitterReturnValueHandler {
    writer: BodyWriter,
}

impl EmitterReturnValueHandler {
    #[must_use]
    pub fn new(writer: BodyWriter) -> Self {
        Self { writer }
    }
}

impl ReturnValueHandler for EmitterReturnValueHandler {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        *return_type == ReturnType::Emitter
    }

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        let emitter = match value {
            ReturnValue::Emitter(emitter) => emitter,
            other => return Err(unexpected(&other, return_type)),
        };
        let data_type = if emitter.is_sse() {
            response.set_content_type(&MediaType::text_event_stream());
            response.set_header(CACHE_CONTROL.as_str(), "no-cache");
            MediaType::application_json()
        } else {
            let selected = self
                .writer
                .select_media_type(&Value::Null, &ValueType::Json, context, response)?
                .unwrap_or_else(MediaType::application_json);
            response.set_content_type(&selected);
            selected
        };
        let (tx, rx) = mpsc::channel();
        response.attach_stream(rx);
        emitter
            .initialize(tx, self.writer.converters().to_vec(), data_type)
            .map_err(|e| ReturnValueError::WriteFailed {
                converter: "ResponseBodyEmitter".to_string(),
                reason: e.to_string(),
            })?;
        debug!(sse = emitter.is_sse(), "Streaming response started");
        Ok(())
    }
}

/// `ResponseEntity` return values: status, headers, then the body.
#[derive(Debug, Clone)]
pub struct ResponseEntityReturnValueHandler {
    writer: BodyWriter,
}

impl ResponseEntityReturnValueHandler {
    #[must_use]
    pub fn new(writer: BodyWriter) -> Self {
        Self { writer }
    }
}

impl ReturnValueHandler for ResponseEntityReturnValueHandler {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        matches!(return_type, ReturnType::Entity(_))
    }

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        let entity = match value {
            ReturnValue::Entity(entity) => entity,
            // a handler declared as returning an entity may still give up
            ReturnValue::Unit => return Ok(()),
            other => return Err(unexpected(&other, return_type)),
        };
        let value_type = match return_type {
            ReturnType::Entity(body_type) => body_type.clone(),
            _ => ValueType::Json,
        };
        let (status, headers, body) = entity.into_parts();
        response.set_status(status);
        copy_headers(headers, response);
        match body {
            Some(body) if !body.is_null() => {
                self.writer.write(body, &value_type, return_type, context, response)
            }
            _ => Ok(()),
        }
    }
}

/// `HttpHeaders` return values: headers only, no body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpHeadersReturnValueHandler;

impl ReturnValueHandler for HttpHeadersReturnValueHandler {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        *return_type == ReturnType::Headers
    }

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        _context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        match value {
            ReturnValue::Headers(headers) => {
                copy_headers(headers, response);
                Ok(())
            }
            other => Err(unexpected(&other, return_type)),
        }
    }
}

/// Body return values, written through the converters.
#[derive(Debug, Clone)]
pub struct ResponseBodyReturnValueHandler {
    writer: BodyWriter,
}

impl ResponseBodyReturnValueHandler {
    #[must_use]
    pub fn new(writer: BodyWriter) -> Self {
        Self { writer }
    }
}

impl ReturnValueHandler for ResponseBodyReturnValueHandler {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        matches!(return_type, ReturnType::Body(_))
    }

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        let body = match value {
            ReturnValue::Body(body) => body,
            ReturnValue::Unit => Value::Null,
            other => return Err(unexpected(&other, return_type)),
        };
        let value_type = match return_type {
            ReturnType::Body(value_type) => value_type.clone(),
            _ => ValueType::Json,
        };
        self.writer.write(body, &value_type, return_type, context, response)
    }
}

/// `void` handlers: nothing to write.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidReturnValueHandler;

impl ReturnValueHandler for VoidReturnValueHandler {
    fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        *return_type == ReturnType::Unit
    }

    fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        _context: &RequestContext<'_>,
        _response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        if !matches!(value, ReturnValue::Unit) {
            warn!(declared = %return_type, "Ignoring value returned from a void handler");
        }
        Ok(())
    }
}

/// Ordered return-value handler chain; the first handler that supports
/// the declared return type handles the value.
#[derive(Debug, Clone)]
pub struct ReturnValueHandlers {
    handlers: Vec<Arc<dyn ReturnValueHandler>>,
}

impl ReturnValueHandlers {
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn ReturnValueHandler>>) -> Self {
        Self { handlers }
    }

    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn ReturnValueHandler>] {
        &self.handlers
    }

    #[must_use]
    pub fn supports_return_type(&self, return_type: &ReturnType) -> bool {
        self.handlers.iter().any(|h| h.supports_return_type(return_type))
    }

    pub fn handle_return_value(
        &self,
        value: ReturnValue,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.supports_return_type(return_type))
            .ok_or_else(|| ReturnValueError::UnsupportedReturnType {
                return_type: return_type.to_string(),
            })?;
        handler.handle_return_value(value, return_type, context, response)
    }
}

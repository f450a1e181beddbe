use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::resolver::ArgumentResolver;
use crate::codec::MessageConverter;
use crate::error::{BindingError, BindingErrorKind};
use crate::handler::{ArgumentValue, Binding, HttpEntity, MethodParameter, ValueType};
use crate::media::MediaType;
use crate::request::{RequestContext, BODY_METHODS};

/// Interception around request-body reading.
///
/// Applicability is decided per call with [`supports`](Self::supports);
/// applicable advice runs in registration order.
pub trait RequestBodyAdvice: Send + Sync + fmt::Debug {
    fn supports(
        &self,
        parameter: &MethodParameter,
        target: &ValueType,
        converter: &dyn MessageConverter,
    ) -> bool;

    /// Inspect or replace the raw body before the converter reads it.
    fn before_body_read(
        &self,
        body: Vec<u8>,
        _parameter: &MethodParameter,
        _converter: &dyn MessageConverter,
    ) -> Vec<u8> {
        body
    }

    /// Inspect or replace the converted value.
    fn after_body_read(
        &self,
        value: Value,
        _parameter: &MethodParameter,
        _converter: &dyn MessageConverter,
    ) -> Value {
        value
    }

    /// Called instead of the read methods when the request has no body.
    fn handle_empty_body(
        &self,
        value: Option<Value>,
        _parameter: &MethodParameter,
        _converter: &dyn MessageConverter,
    ) -> Option<Value> {
        value
    }
}

/// Reads request bodies through the converter list and the body advice.
#[derive(Debug, Clone)]
pub struct BodyReader {
    converters: Vec<Arc<dyn MessageConverter>>,
    advice: Vec<Arc<dyn RequestBodyAdvice>>,
}

impl BodyReader {
    #[must_use]
    pub fn new(
        converters: Vec<Arc<dyn MessageConverter>>,
        advice: Vec<Arc<dyn RequestBodyAdvice>>,
    ) -> Self {
        Self { converters, advice }
    }

    fn supported_media_types(&self, target: &ValueType) -> Vec<MediaType> {
        let mut types: Vec<MediaType> = Vec::new();
        for converter in &self.converters {
            if converter.can_read(target, None) {
                for media_type in converter.supported_media_types() {
                    if !types.contains(media_type) {
                        types.push(media_type.clone());
                    }
                }
            }
        }
        types
    }

    /// Read the body into `target`.
    ///
    /// `Ok(None)` means there is no body value: either the body was empty,
    /// or no converter applies to a request that is not expected to carry
    /// a body.
    pub fn read(
        &self,
        parameter: &MethodParameter,
        target: &ValueType,
        context: &RequestContext<'_>,
    ) -> Result<Option<Value>, BindingError> {
        let request = context.request();
        let (content_type, no_content_type) = match request.content_type() {
            None => (MediaType::application_octet_stream(), true),
            Some(Ok(media_type)) => (media_type, false),
            Some(Err(e)) => {
                return Err(BindingError::new(
                    &parameter.name,
                    target,
                    BindingErrorKind::UnsupportedMediaType {
                        content_type: e.input,
                        supported: self.supported_media_types(target),
                    },
                ))
            }
        };
        let has_body = request.has_body();

        for converter in &self.converters {
            if !converter.can_read(target, Some(&content_type)) {
                continue;
            }
            let advice: Vec<&Arc<dyn RequestBodyAdvice>> = self
                .advice
                .iter()
                .filter(|a| a.supports(parameter, target, converter.as_ref()))
                .collect();
            debug!(
                parameter = %parameter.name,
                converter = converter.name(),
                content_type = %content_type,
                has_body = has_body,
                advice_count = advice.len(),
                "Reading request body"
            );
            if !has_body {
                return Ok(advice
                    .iter()
                    .fold(None, |value, a| a.handle_empty_body(value, parameter, converter.as_ref())));
            }
            let body = advice.iter().fold(request.body().to_vec(), |body, a| {
                a.before_body_read(body, parameter, converter.as_ref())
            });
            let value = converter
                .read(target, &body, Some(&content_type))
                .map_err(|e| {
                    BindingError::new(
                        &parameter.name,
                        target,
                        BindingErrorKind::UnreadableBody { reason: e.to_string() },
                    )
                })?;
            let value = advice
                .iter()
                .fold(value, |value, a| a.after_body_read(value, parameter, converter.as_ref()));
            return Ok(Some(value));
        }

        if !BODY_METHODS.contains(request.method()) || (no_content_type && !has_body) {
            return Ok(None);
        }
        Err(BindingError::new(
            &parameter.name,
            target,
            BindingErrorKind::UnsupportedMediaType {
                content_type: content_type.to_string(),
                supported: self.supported_media_types(target),
            },
        ))
    }
}

/// `RequestBody` parameters.
#[derive(Debug, Clone)]
pub struct RequestBodyResolver {
    reader: BodyReader,
}

impl RequestBodyResolver {
    #[must_use]
    pub fn new(reader: BodyReader) -> Self {
        Self { reader }
    }
}

impl ArgumentResolver for RequestBodyResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        matches!(parameter.binding, Binding::RequestBody { .. })
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let value = self
            .reader
            .read(parameter, parameter.value_type.nested(), context)?
            .filter(|v| !v.is_null());
        match value {
            Some(value) => Ok(ArgumentValue::Value(value)),
            None if parameter.is_optional() => Ok(ArgumentValue::Null),
            None => Err(BindingError::new(
                &parameter.name,
                &parameter.value_type,
                BindingErrorKind::BodyMissing,
            )),
        }
    }
}

/// Unannotated `HttpEntity<T>` parameters: headers plus the body.
#[derive(Debug, Clone)]
pub struct HttpEntityResolver {
    reader: BodyReader,
}

impl HttpEntityResolver {
    #[must_use]
    pub fn new(reader: BodyReader) -> Self {
        Self { reader }
    }
}

impl ArgumentResolver for HttpEntityResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.binding == Binding::Unannotated
            && matches!(parameter.value_type.nested(), ValueType::Entity(_))
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let target = match parameter.value_type.nested() {
            ValueType::Entity(inner) => inner.as_ref(),
            other => other,
        };
        let body = self.reader.read(parameter, target, context)?.unwrap_or(Value::Null);
        Ok(ArgumentValue::Entity(HttpEntity {
            headers: context.request().headers().clone(),
            body,
        }))
    }
}

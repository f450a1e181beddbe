use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::codec::MessageConverter;
use crate::error::ReturnValueError;
use crate::handler::{ReturnType, ValueType};
use crate::media::{most_specific_media_type, sort_by_specificity_and_quality, ContentNegotiator, MediaType};
use crate::request::RequestContext;
use crate::response::HttpResponse;

/// Interception before a response body is written.
///
/// Applicability is decided per call with [`supports`](Self::supports);
/// applicable advice runs in registration order, each seeing the previous
/// one's result.
pub trait ResponseBodyAdvice: Send + Sync + fmt::Debug {
    fn supports(&self, return_type: &ReturnType, converter: &dyn MessageConverter) -> bool;

    /// Return the body to write; `Value::Null` drops it.
    fn before_body_write(
        &self,
        body: Value,
        content_type: &MediaType,
        converter: &dyn MessageConverter,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Value;
}

/// Writes bodies with content negotiation over the converter list.
#[derive(Debug, Clone)]
pub struct BodyWriter {
    converters: Vec<Arc<dyn MessageConverter>>,
    advice: Vec<Arc<dyn ResponseBodyAdvice>>,
    negotiator: Arc<dyn ContentNegotiator>,
}

impl BodyWriter {
    #[must_use]
    pub fn new(
        converters: Vec<Arc<dyn MessageConverter>>,
        advice: Vec<Arc<dyn ResponseBodyAdvice>>,
        negotiator: Arc<dyn ContentNegotiator>,
    ) -> Self {
        Self {
            converters,
            advice,
            negotiator,
        }
    }

    #[must_use]
    pub fn converters(&self) -> &[Arc<dyn MessageConverter>] {
        &self.converters
    }

    /// Every media type some converter writes `value_type` as.
    #[must_use]
    pub fn writable_media_types(&self, value_type: &ValueType) -> Vec<MediaType> {
        let mut types: Vec<MediaType> = Vec::new();
        for converter in &self.converters {
            if converter.can_write(value_type, None) {
                for media_type in converter.supported_media_types() {
                    if !types.contains(media_type) {
                        types.push(media_type.clone());
                    }
                }
            }
        }
        types
    }

    /// Producible types: the matched produces condition, else whatever the
    /// converters can write, else `*/*`.
    fn producible_media_types(&self, value_type: &ValueType, context: &RequestContext<'_>) -> Vec<MediaType> {
        let declared = &context.scratch().producible_media_types;
        if !declared.is_empty() {
            return declared.clone();
        }
        let writable = self.writable_media_types(value_type);
        if writable.is_empty() {
            vec![MediaType::all()]
        } else {
            writable
        }
    }

    /// Pick the response media type.
    ///
    /// `Ok(None)` only for a null body with nothing to negotiate.
    pub fn select_media_type(
        &self,
        body: &Value,
        value_type: &ValueType,
        context: &RequestContext<'_>,
        response: &HttpResponse,
    ) -> Result<Option<MediaType>, ReturnValueError> {
        if let Some(preset) = response.content_type().filter(MediaType::is_concrete) {
            trace!(content_type = %preset, "Using preset content type");
            return Ok(Some(preset));
        }

        let producible = self.producible_media_types(value_type, context);
        let acceptable = context
            .request()
            .acceptable_media_types(self.negotiator.as_ref())
            .map_err(|_| ReturnValueError::NotAcceptable {
                producible: producible.clone(),
            })?;

        let mut compatible: Vec<MediaType> = Vec::new();
        for accept in acceptable {
            for produce in &producible {
                if produce.is_compatible_with(accept) {
                    compatible.push(most_specific_media_type(accept, produce));
                }
            }
        }
        if compatible.is_empty() {
            if body.is_null() {
                return Ok(None);
            }
            return Err(ReturnValueError::NotAcceptable { producible });
        }
        sort_by_specificity_and_quality(&mut compatible);

        let fallbacks = [MediaType::all(), MediaType::new("application", "*")];
        let selected = compatible.iter().find_map(|candidate| {
            if candidate.is_concrete() {
                Some(candidate.clone())
            } else if candidate.is_present_in(&fallbacks) {
                Some(MediaType::application_octet_stream())
            } else {
                None
            }
        });
        debug!(
            acceptable = ?acceptable,
            producible = ?producible,
            selected = ?selected.as_ref().map(ToString::to_string),
            "Negotiated response media type"
        );
        Ok(selected.map(|m| m.remove_quality()))
    }

    /// Write `body` into `response`.
    ///
    /// # Errors
    ///
    /// * `NotAcceptable` when no acceptable type is producible, or when the
    ///   negotiated type has no writer
    /// * `NotWritable` when a preset content type or declared produces has
    ///   no writer
    /// * `WriteFailed` when the converter fails
    pub fn write(
        &self,
        body: Value,
        value_type: &ValueType,
        return_type: &ReturnType,
        context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<(), ReturnValueError> {
        let preset = response.content_type().filter(MediaType::is_concrete);
        let selected = self.select_media_type(&body, value_type, context, response)?;

        if let Some(selected) = &selected {
            for converter in &self.converters {
                if !converter.can_write(value_type, Some(selected)) {
                    continue;
                }
                let body = self
                    .advice
                    .iter()
                    .filter(|a| a.supports(return_type, converter.as_ref()))
                    .fold(body, |body, a| {
                        a.before_body_write(body, selected, converter.as_ref(), context, response)
                    });
                if body.is_null() {
                    trace!(converter = converter.name(), "Body dropped before writing");
                    return Ok(());
                }
                let bytes = converter
                    .write(&body, selected)
                    .map_err(|e| ReturnValueError::WriteFailed {
                        converter: e.converter,
                        reason: e.reason,
                    })?;
                debug!(
                    converter = converter.name(),
                    content_type = %selected,
                    bytes = bytes.len(),
                    "Response body written"
                );
                response.set_content_type(selected);
                response.set_body(bytes);
                return Ok(());
            }
        }

        if body.is_null() {
            return Ok(());
        }
        let declared = !context.scratch().producible_media_types.is_empty();
        match (preset, selected) {
            (Some(content_type), _) => Err(ReturnValueError::NotWritable {
                content_type,
                value_type: value_type.to_string(),
            }),
            (None, Some(content_type)) if declared => Err(ReturnValueError::NotWritable {
                content_type,
                value_type: value_type.to_string(),
            }),
            _ => Err(ReturnValueError::NotAcceptable {
                producible: self.writable_media_types(value_type),
            }),
        }
    }
}

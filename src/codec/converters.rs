use serde_json::Value;

use super::{supports_read_media_type, supports_write_media_type, ConversionError, MessageConverter};
use crate::handler::ValueType;
use crate::media::MediaType;

/// Plain text bodies for `String` values.
#[derive(Debug, Clone)]
pub struct StringMessageConverter {
    supported: Vec<MediaType>,
}

impl Default for StringMessageConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl StringMessageConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: vec![MediaType::text_plain(), MediaType::all()],
        }
    }
}

impl MessageConverter for StringMessageConverter {
    fn name(&self) -> &str {
        "StringMessageConverter"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.supported
    }

    fn can_read(&self, target: &ValueType, media_type: Option<&MediaType>) -> bool {
        *target.nested() == ValueType::String && supports_read_media_type(&self.supported, media_type)
    }

    fn read(
        &self,
        _target: &ValueType,
        body: &[u8],
        media_type: Option<&MediaType>,
    ) -> Result<Value, ConversionError> {
        if let Some(charset) = media_type.and_then(|m| m.parameter("charset")) {
            let charset = charset.to_ascii_lowercase();
            if charset != "utf-8" && charset != "utf8" && charset != "us-ascii" {
                return Err(ConversionError::new(self.name(), format!("unsupported charset '{charset}'")));
            }
        }
        std::str::from_utf8(body)
            .map(|text| Value::String(text.to_string()))
            .map_err(|e| ConversionError::new(self.name(), e))
    }

    fn can_write(&self, value_type: &ValueType, media_type: Option<&MediaType>) -> bool {
        *value_type.nested() == ValueType::String && supports_write_media_type(&self.supported, media_type)
    }

    fn write(&self, value: &Value, _media_type: &MediaType) -> Result<Vec<u8>, ConversionError> {
        Ok(match value {
            Value::String(text) => text.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        })
    }
}

/// JSON bodies via `serde_json`.
#[derive(Debug, Clone)]
pub struct JsonMessageConverter {
    supported: Vec<MediaType>,
}

impl Default for JsonMessageConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonMessageConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: vec![MediaType::application_json(), MediaType::application_any_json()],
        }
    }
}

fn is_body_type(value_type: &ValueType) -> bool {
    !matches!(
        value_type.nested(),
        ValueType::Method | ValueType::Headers | ValueType::Session
    )
}

/// Whether a decoded JSON value fits the declared target. `null` fits
/// everything; absence is decided by the caller.
fn conforms(value: &Value, target: &ValueType) -> bool {
    match (target.nested(), value) {
        (_, Value::Null) => true,
        (ValueType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (ValueType::Float, Value::Number(_))
        | (ValueType::String, Value::String(_))
        | (ValueType::Boolean, Value::Bool(_))
        | (ValueType::Map, Value::Object(_)) => true,
        (ValueType::List(inner), Value::Array(items)) => items.iter().all(|i| conforms(i, inner)),
        (ValueType::Json, _) => true,
        (ValueType::Entity(inner), value) => conforms(value, inner),
        _ => false,
    }
}

impl MessageConverter for JsonMessageConverter {
    fn name(&self) -> &str {
        "JsonMessageConverter"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.supported
    }

    fn can_read(&self, target: &ValueType, media_type: Option<&MediaType>) -> bool {
        is_body_type(target) && supports_read_media_type(&self.supported, media_type)
    }

    fn read(
        &self,
        target: &ValueType,
        body: &[u8],
        _media_type: Option<&MediaType>,
    ) -> Result<Value, ConversionError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| ConversionError::new(self.name(), e))?;
        if !conforms(&value, target) {
            return Err(ConversionError::new(
                self.name(),
                format!("JSON value does not match declared type {target}"),
            ));
        }
        Ok(value)
    }

    fn can_write(&self, value_type: &ValueType, media_type: Option<&MediaType>) -> bool {
        is_body_type(value_type) && supports_write_media_type(&self.supported, media_type)
    }

    fn write(&self, value: &Value, _media_type: &MediaType) -> Result<Vec<u8>, ConversionError> {
        serde_json::to_vec(value).map_err(|e| ConversionError::new(self.name(), e))
    }
}

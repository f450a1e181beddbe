//! # Codec Module
//!
//! Body codecs behind the [`MessageConverter`] trait. The argument
//! resolvers use them to read request bodies, the return-value handlers to
//! write response bodies. Converters are consulted in registration order
//! and the first one that accepts the type and media type wins.
//!
//! Two converters ship with the crate:
//!
//! - [`StringMessageConverter`]: `text/plain` and `*/*`, `String` values only
//! - [`JsonMessageConverter`]: `application/json` and `application/*+json`,
//!   any value, built on `serde_json`

mod converters;
#[cfg(test)]
mod tests;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::handler::ValueType;
use crate::media::MediaType;

pub use converters::{JsonMessageConverter, StringMessageConverter};

/// A converter failed to read or write a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub converter: String,
    pub reason: String,
}

impl ConversionError {
    #[must_use]
    pub fn new(converter: &str, reason: impl fmt::Display) -> Self {
        Self {
            converter: converter.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.converter, self.reason)
    }
}

impl std::error::Error for ConversionError {}

/// Reads request bodies into values and writes values into response bodies.
pub trait MessageConverter: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Media types this converter reads and writes.
    fn supported_media_types(&self) -> &[MediaType];

    /// Whether this converter reads `target` from a body of `media_type`.
    /// `None` means the content type is unknown.
    fn can_read(&self, target: &ValueType, media_type: Option<&MediaType>) -> bool;

    fn read(
        &self,
        target: &ValueType,
        body: &[u8],
        media_type: Option<&MediaType>,
    ) -> Result<Value, ConversionError>;

    /// Whether this converter writes values of `value_type` as
    /// `media_type`. `None` asks "for any media type".
    fn can_write(&self, value_type: &ValueType, media_type: Option<&MediaType>) -> bool;

    fn write(&self, value: &Value, media_type: &MediaType) -> Result<Vec<u8>, ConversionError>;
}

/// Read-side media check: unknown content types are accepted, otherwise
/// one supported type must include it.
pub(crate) fn supports_read_media_type(supported: &[MediaType], media_type: Option<&MediaType>) -> bool {
    match media_type {
        None => true,
        Some(media_type) => supported.iter().any(|s| s.includes(media_type)),
    }
}

/// Write-side media check: `None` and `*/*` are accepted, otherwise one
/// supported type must be compatible.
pub(crate) fn supports_write_media_type(supported: &[MediaType], media_type: Option<&MediaType>) -> bool {
    match media_type {
        None => true,
        Some(media_type) if media_type.is_wildcard_type() => true,
        Some(media_type) => supported.iter().any(|s| s.is_compatible_with(media_type)),
    }
}

/// The converters used when the host configures none.
#[must_use]
pub fn default_converters() -> Vec<Arc<dyn MessageConverter>> {
    vec![
        Arc::new(StringMessageConverter::new()),
        Arc::new(JsonMessageConverter::new()),
    ]
}

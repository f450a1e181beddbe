//! # Return Value Module
//!
//! Turns whatever a handler returned into response state. The chain of
//! [`ReturnValueHandler`]s is consulted in order and the first handler that
//! supports the declared [`ReturnType`](crate::handler::ReturnType) wins:
//!
//! 1. [`EmitterReturnValueHandler`]: streaming bodies and server-sent events
//! 2. [`ResponseEntityReturnValueHandler`]: status, headers and body
//! 3. [`HttpHeadersReturnValueHandler`]: headers only
//! 4. [`ResponseBodyReturnValueHandler`]: a body written via negotiation
//! 5. [`VoidReturnValueHandler`]: nothing
//!
//! Body writing goes through [`BodyWriter`], which negotiates the media type
//! from the request's acceptable types and the producible types (declared
//! `produces`, else whatever the converters write) and runs
//! [`ResponseBodyAdvice`] before the converter.

mod emitter;
mod entity;
mod handlers;
mod writer;

use std::sync::Arc;

pub use emitter::{EmitterError, ResponseBodyEmitter, SseEvent};
pub use entity::ResponseEntity;
pub use handlers::{
    EmitterReturnValueHandler, HttpHeadersReturnValueHandler, ResponseBodyReturnValueHandler,
    ResponseEntityReturnValueHandler, ReturnValueHandler, ReturnValueHandlers,
    VoidReturnValueHandler,
};
pub use writer::{BodyWriter, ResponseBodyAdvice};

/// The default handler chain over `writer`.
#[must_use]
pub fn default_return_handlers(writer: &BodyWriter) -> ReturnValueHandlers {
    ReturnValueHandlers::new(vec![
        Arc::new(EmitterReturnValueHandler::new(writer.clone())),
        Arc::new(ResponseEntityReturnValueHandler::new(writer.clone())),
        Arc::new(HttpHeadersReturnValueHandler),
        Arc::new(ResponseBodyReturnValueHandler::new(writer.clone())),
        Arc::new(VoidReturnValueHandler),
    ])
}

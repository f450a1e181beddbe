//! # Bind Module
//!
//! Turns a matched request into handler arguments through an ordered chain
//! of [`ArgumentResolver`]s. The first resolver that supports a parameter
//! wins; the winner is cached per parameter.
//!
//! ## Default Order
//!
//! 1. Annotation-driven: `RequestParam`, `RequestParam` map, `PathVariable`,
//!    `PathVariable` map, `RequestBody`, `RequestHeader`, `RequestHeader`
//!    map, `CookieValue`, `SessionAttribute`
//! 2. Type-driven: HTTP method, headers, session, `HttpEntity`
//! 3. Custom resolvers supplied by the host
//! 4. Catch-all: unannotated simple types bind as optional request
//!    parameters, unannotated structured types as a model object
//!
//! ## Named Values
//!
//! Path variables, request parameters, headers, cookies and session
//! attributes share one binding rule set: the name defaults to the
//! parameter name, a missing or empty value falls back to the declared
//! default, a missing required value fails, and the raw value is converted
//! to the declared [`ValueType`](crate::handler::ValueType).
//!
//! ## Bodies
//!
//! Bodies are read with the first [`MessageConverter`] that accepts the
//! target type and content type, wrapped by the applicable
//! [`RequestBodyAdvice`].

mod body;
mod convert;
mod named;
mod resolver;
mod typed;

use std::sync::Arc;

use crate::codec::MessageConverter;

pub use body::{BodyReader, HttpEntityResolver, RequestBodyAdvice, RequestBodyResolver};
pub use convert::{convert, RawValue};
pub use named::{
    CookieValueResolver, CookieValueSource, NamedValueResolver, NamedValueSource,
    PathVariableMapResolver, PathVariableResolver, PathVariableSource, RequestHeaderMapResolver,
    RequestHeaderResolver, RequestHeaderSource, RequestParamMapResolver, RequestParamResolver,
    RequestParamSource, SessionAttributeResolver, SessionAttributeSource,
};
pub use resolver::{ArgumentResolver, ArgumentResolvers};
pub use typed::{
    HttpHeadersResolver, HttpMethodResolver, ModelAttributeResolver, SessionResolver,
    SimpleValueFallbackResolver,
};

/// The default resolver chain with `custom` resolvers slotted in before the
/// catch-all.
#[must_use]
pub fn default_resolvers(
    converters: Vec<Arc<dyn MessageConverter>>,
    advice: Vec<Arc<dyn RequestBodyAdvice>>,
    custom: Vec<Arc<dyn ArgumentResolver>>,
) -> Vec<Arc<dyn ArgumentResolver>> {
    let reader = BodyReader::new(converters, advice);
    let mut resolvers: Vec<Arc<dyn ArgumentResolver>> = vec![
        Arc::new(RequestParamResolver::new(RequestParamSource)),
        Arc::new(RequestParamMapResolver),
        Arc::new(PathVariableResolver::new(PathVariableSource)),
        Arc::new(PathVariableMapResolver),
        Arc::new(RequestBodyResolver::new(reader.clone())),
        Arc::new(RequestHeaderResolver::new(RequestHeaderSource)),
        Arc::new(RequestHeaderMapResolver),
        Arc::new(CookieValueResolver::new(CookieValueSource)),
        Arc::new(SessionAttributeResolver::new(SessionAttributeSource)),
        Arc::new(HttpMethodResolver),
        Arc::new(HttpHeadersResolver),
        Arc::new(SessionResolver),
        Arc::new(HttpEntityResolver::new(reader)),
    ];
    resolvers.extend(custom);
    resolvers.push(Arc::new(SimpleValueFallbackResolver));
    resolvers.push(Arc::new(ModelAttributeResolver));
    resolvers
}

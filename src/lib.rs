//! # brrtmvc
//!
//! **brrtmvc** is the request-dispatch core of an annotation-style web
//! framework: given an already-parsed HTTP request it selects exactly one
//! handler method out of the registered mappings, binds the request's data
//! to the handler's typed parameters, invokes it, and turns the return value
//! into a response through content negotiation.
//!
//! Transport, HTTP parsing, view rendering and bean wiring are out of scope;
//! the host hands in an [`HttpRequest`](request::HttpRequest) and receives an
//! [`HttpResponse`](response::HttpResponse).
//!
//! ## Architecture
//!
//! - **[`media`]** - Media types and the content-negotiation collaborator
//! - **[`pattern`]** - Path patterns: the parsed strategy and the
//!   string-template [`PathMatcher`](pattern::PathMatcher)
//! - **[`condition`]** - Combinable, comparable request conditions (path,
//!   methods, params, headers, consumes, produces, custom)
//! - **[`mapping`]** - [`MappingDescriptor`](mapping::MappingDescriptor),
//!   one condition of every kind, built immutably
//! - **[`handler`]** - Handler identity, parameter and return signatures
//! - **[`registry`]** - Descriptor → handler registrations behind a
//!   lock-free snapshot
//! - **[`dispatcher`]** - Lookup, ranking, no-match diagnosis, `OPTIONS`
//!   answers and the full dispatch pipeline
//! - **[`codec`]** - Body converters (`text/plain`, JSON)
//! - **[`bind`]** - The argument resolver chain and request-body advice
//! - **[`returns`]** - The return-value handler chain, response-body advice
//!   and streaming emitters
//! - **[`config`]** / **[`logging`]** - Settings and subscriber bootstrap
//!
//! ## Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Dispatcher
//!     participant Registry
//!     participant Resolvers as ArgumentResolvers
//!     participant Handler
//!     participant Returns as ReturnValueHandlers
//!
//!     Host->>Dispatcher: handle(&request)
//!     Dispatcher->>Registry: snapshot()
//!     Dispatcher->>Dispatcher: direct hits, else full scan
//!     Dispatcher->>Dispatcher: rank candidates (compare_to)
//!     alt no candidate
//!         Dispatcher-->>Host: 405 / 415 / 406 / 400 / 404 or OPTIONS answer
//!     else ambiguous
//!         Dispatcher-->>Host: 500 AmbiguousMapping
//!     end
//!     Dispatcher->>Resolvers: resolve_arguments(handler, context)
//!     Resolvers-->>Dispatcher: Arguments
//!     Dispatcher->>Handler: invoke(&arguments)
//!     Handler-->>Dispatcher: ReturnValue
//!     Dispatcher->>Returns: handle_return_value(...)
//!     Returns-->>Dispatcher: response written
//!     Dispatcher-->>Host: HttpResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtmvc::dispatcher::Dispatcher;
//! use brrtmvc::handler::{Binding, HandlerMethod, ReturnType, ReturnValue, ValueType};
//! use brrtmvc::registry::Registry;
//! use brrtmvc::request::HttpRequest;
//! use http::Method;
//!
//! let registry = Arc::new(Registry::default());
//! let show = HandlerMethod::builder("ItemController", "show")
//!     .param("id", ValueType::String, Binding::path_variable())
//!     .returns(ReturnType::Body(ValueType::String))
//!     .invoke(|args| Ok(ReturnValue::text(args.str("id").unwrap_or_default())));
//! registry
//!     .register(
//!         registry.mapping(&["/items/{id}"]).methods(&[Method::GET]).build()?,
//!         show,
//!     )?;
//!
//! let dispatcher = Dispatcher::new(Arc::clone(&registry));
//! let response = dispatcher.handle(&HttpRequest::builder(Method::GET, "/items/42").build());
//! assert_eq!(response.body_text(), "42");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bind;
pub mod codec;
pub mod condition;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logging;
pub mod mapping;
pub mod media;
pub mod pattern;
pub mod registry;
pub mod request;
pub mod response;
pub mod returns;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, DispatcherBuilder, Lookup};
pub use error::{
    BindingError, DescriptorError, DispatchError, MatchError, RegistrationError, ReturnValueError,
};
pub use handler::{HandlerMethod, ReturnValue};
pub use mapping::MappingDescriptor;
pub use media::MediaType;
pub use registry::Registry;
pub use request::HttpRequest;
pub use response::HttpResponse;

//! # Handler Module
//!
//! What the core knows about a handler method: its identity
//! ([`HandlerId`]), its parameter list ([`MethodParameter`]), its declared
//! [`ReturnType`], and an opaque invoker. The dispatcher never introspects
//! the invoker; it only hands it the resolved [`Arguments`].
//!
//! ```text
//! HandlerMethod::builder("ItemController", "show")
//!     .param("id", ValueType::Integer, Binding::path_variable())
//!     .returns(ReturnType::Body(ValueType::Json))
//!     .invoke(|args| Ok(ReturnValue::body(json!({"id": args.i64("id")}))))
//! ```

use anyhow::Context;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::request::Session;
use crate::returns::{ResponseBodyEmitter, ResponseEntity};

/// Identity of a handler method: declaring component plus method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId {
    bean: Arc<str>,
    method: Arc<str>,
}

impl HandlerId {
    #[must_use]
    pub fn new(bean: &str, method: &str) -> Self {
        Self {
            bean: Arc::from(bean),
            method: Arc::from(method),
        }
    }

    #[must_use]
    pub fn bean(&self) -> &str {
        &self.bean
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.bean, self.method)
    }
}

/// Cache key for per-parameter decisions (resolver winners).
///
/// Carries the full declaration, not just the position: handlers sharing a
/// [`HandlerId`] may declare different parameters at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSignature {
    pub handler: HandlerId,
    pub index: usize,
    pub name: Arc<str>,
    pub value_type: ValueType,
    pub binding: Binding,
}

impl ParameterSignature {
    #[must_use]
    pub fn new(handler: &HandlerId, parameter: &MethodParameter) -> Self {
        Self {
            handler: handler.clone(),
            index: parameter.index,
            name: Arc::clone(&parameter.name),
            value_type: parameter.value_type.clone(),
            binding: parameter.binding.clone(),
        }
    }
}

/// Declared type of a parameter or body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    /// Any JSON value (objects, arrays, model types deserialized later)
    Json,
    List(Box<ValueType>),
    /// Name to value(s) map, rendered as a JSON object
    Map,
    Optional(Box<ValueType>),
    /// The request's HTTP method
    Method,
    /// The request headers
    Headers,
    Session,
    /// Headers plus body
    Entity(Box<ValueType>),
}

impl ValueType {
    #[must_use]
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn list(inner: ValueType) -> Self {
        ValueType::List(Box::new(inner))
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, ValueType::Optional(_))
    }

    /// The wrapped type for `Optional<T>`, otherwise `self`.
    #[must_use]
    pub fn nested(&self) -> &ValueType {
        match self {
            ValueType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Scalar types (and lists of them) that bind from a single string.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        match self.nested() {
            ValueType::String | ValueType::Integer | ValueType::Float | ValueType::Boolean => true,
            ValueType::List(inner) => inner.is_simple(),
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => f.write_str("String"),
            ValueType::Integer => f.write_str("Integer"),
            ValueType::Float => f.write_str("Float"),
            ValueType::Boolean => f.write_str("Boolean"),
            ValueType::Json => f.write_str("Json"),
            ValueType::List(inner) => write!(f, "List<{inner}>"),
            ValueType::Map => f.write_str("Map"),
            ValueType::Optional(inner) => write!(f, "Optional<{inner}>"),
            ValueType::Method => f.write_str("HttpMethod"),
            ValueType::Headers => f.write_str("HttpHeaders"),
            ValueType::Session => f.write_str("HttpSession"),
            ValueType::Entity(inner) => write!(f, "HttpEntity<{inner}>"),
        }
    }
}

/// Settings shared by the named-value bindings (path variable, request
/// parameter, header, cookie, session attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedValue {
    /// Defaults to the parameter name
    pub name: Option<String>,
    pub required: bool,
    pub default_value: Option<String>,
}

impl Default for NamedValue {
    fn default() -> Self {
        Self {
            name: None,
            required: true,
            default_value: None,
        }
    }
}

impl NamedValue {
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// A default also makes the value non-required.
    #[must_use]
    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self.required = false;
        self
    }
}

/// Where a parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    PathVariable(NamedValue),
    RequestParam(NamedValue),
    RequestHeader(NamedValue),
    CookieValue(NamedValue),
    SessionAttribute(NamedValue),
    RequestBody { required: bool },
    /// Resolved by type, by a custom resolver, or by the catch-all
    Unannotated,
}

impl Binding {
    #[must_use]
    pub fn path_variable() -> Self {
        Binding::PathVariable(NamedValue::default())
    }

    #[must_use]
    pub fn request_param() -> Self {
        Binding::RequestParam(NamedValue::default())
    }

    #[must_use]
    pub fn request_header() -> Self {
        Binding::RequestHeader(NamedValue::default())
    }

    #[must_use]
    pub fn cookie_value() -> Self {
        Binding::CookieValue(NamedValue::default())
    }

    #[must_use]
    pub fn session_attribute() -> Self {
        Binding::SessionAttribute(NamedValue::default())
    }

    #[must_use]
    pub fn request_body() -> Self {
        Binding::RequestBody { required: true }
    }
}

/// One declared parameter of a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodParameter {
    pub index: usize,
    pub name: Arc<str>,
    pub value_type: ValueType,
    pub binding: Binding,
}

impl MethodParameter {
    /// Whether an absent value is acceptable for this parameter: declared
    /// `Optional<T>`, or a binding that is not required.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        if self.value_type.is_optional() {
            return true;
        }
        match &self.binding {
            Binding::PathVariable(nv)
            | Binding::RequestParam(nv)
            | Binding::RequestHeader(nv)
            | Binding::CookieValue(nv)
            | Binding::SessionAttribute(nv) => !nv.required,
            Binding::RequestBody { required } => !required,
            Binding::Unannotated => false,
        }
    }
}

impl fmt::Display for MethodParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.index, self.name, self.value_type)
    }
}

/// An `HttpEntity` argument: request headers plus the converted body.
#[derive(Debug, Clone)]
pub struct HttpEntity {
    pub headers: HeaderMap,
    pub body: Value,
}

/// A resolved argument.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    Null,
    Value(Value),
    /// `Optional<T>` parameters; absence is `Optional(None)`
    Optional(Option<Value>),
    Method(Method),
    Headers(HeaderMap),
    Session(Arc<Session>),
    Entity(HttpEntity),
}

impl ArgumentValue {
    /// The JSON view of plain and optional values.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ArgumentValue::Value(v) | ArgumentValue::Optional(Some(v)) => Some(v),
            _ => None,
        }
    }
}

/// Resolved arguments of one invocation, addressable by index or name.
#[derive(Debug, Clone)]
pub struct Arguments {
    parameters: Arc<[MethodParameter]>,
    values: Vec<ArgumentValue>,
}

impl Arguments {
    #[must_use]
    pub fn new(parameters: Arc<[MethodParameter]>, values: Vec<ArgumentValue>) -> Self {
        Self { parameters, values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ArgumentValue> {
        self.values.get(index)
    }

    /// Argument of the parameter declared with `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ArgumentValue> {
        let index = self.parameters.iter().position(|p| p.name.as_ref() == name)?;
        self.values.get(index)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.by_name(name).and_then(ArgumentValue::as_value)
    }

    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    /// Deserialize an argument into a model type.
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .value(name)
            .with_context(|| format!("argument '{name}' is absent"))?;
        serde_json::from_value(value.clone()).with_context(|| format!("argument '{name}'"))
    }
}

/// Declared return type, used to pick a return-value handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// Nothing to write
    Unit,
    /// A body written through a message converter
    Body(ValueType),
    /// Status, headers and an optional body
    Entity(ValueType),
    /// Headers only
    Headers,
    /// A streaming emitter (plain or server-sent events)
    Emitter,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Unit => f.write_str("void"),
            ReturnType::Body(t) => write!(f, "{t}"),
            ReturnType::Entity(t) => write!(f, "ResponseEntity<{t}>"),
            ReturnType::Headers => f.write_str("HttpHeaders"),
            ReturnType::Emitter => f.write_str("ResponseBodyEmitter"),
        }
    }
}

/// What a handler returned.
#[derive(Debug)]
pub enum ReturnValue {
    Unit,
    /// `Value::Null` means "no body"
    Body(Value),
    Entity(ResponseEntity),
    Headers(HeaderMap),
    Emitter(ResponseBodyEmitter),
}

impl ReturnValue {
    #[must_use]
    pub fn body(value: Value) -> Self {
        ReturnValue::Body(value)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        ReturnValue::Body(Value::String(value.into()))
    }
}

/// The opaque callable behind a handler.
pub type Invoker = Arc<dyn Fn(&Arguments) -> anyhow::Result<ReturnValue> + Send + Sync>;

/// A registered handler: identity, parameters, return type and invoker.
#[derive(Clone)]
pub struct HandlerMethod {
    id: HandlerId,
    parameters: Arc<[MethodParameter]>,
    return_type: ReturnType,
    invoker: Invoker,
}

impl HandlerMethod {
    #[must_use]
    pub fn builder(bean: &str, method: &str) -> HandlerMethodBuilder {
        HandlerMethodBuilder {
            id: HandlerId::new(bean, method),
            parameters: Vec::new(),
            return_type: ReturnType::Body(ValueType::Json),
        }
    }

    #[must_use]
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    #[must_use]
    pub fn parameters(&self) -> &Arc<[MethodParameter]> {
        &self.parameters
    }

    #[must_use]
    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    /// The `RequestBody` parameter, if declared.
    #[must_use]
    pub fn body_parameter(&self) -> Option<&MethodParameter> {
        self.parameters
            .iter()
            .find(|p| matches!(p.binding, Binding::RequestBody { .. }))
    }

    pub fn invoke(&self, arguments: &Arguments) -> anyhow::Result<ReturnValue> {
        (self.invoker)(arguments)
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("id", &self.id)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.value_type))
            .collect();
        write!(f, "{}({}) -> {}", self.id, params.join(", "), self.return_type)
    }
}

/// Builder for [`HandlerMethod`]; parameter indexes follow declaration
/// order.
#[derive(Debug)]
pub struct HandlerMethodBuilder {
    id: HandlerId,
    parameters: Vec<MethodParameter>,
    return_type: ReturnType,
}

impl HandlerMethodBuilder {
    #[must_use]
    pub fn param(mut self, name: &str, value_type: ValueType, binding: Binding) -> Self {
        let index = self.parameters.len();
        self.parameters.push(MethodParameter {
            index,
            name: Arc::from(name),
            value_type,
            binding,
        });
        self
    }

    /// Defaults to `Body(Json)`.
    #[must_use]
    pub fn returns(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn invoke<F>(self, invoker: F) -> HandlerMethod
    where
        F: Fn(&Arguments) -> anyhow::Result<ReturnValue> + Send + Sync + 'static,
    {
        HandlerMethod {
            id: self.id,
            parameters: self.parameters.into(),
            return_type: self.return_type,
            invoker: Arc::new(invoker),
        }
    }
}

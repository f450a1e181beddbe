use serde_json::{Map, Value};
use std::fmt;

use super::convert::{convert, RawValue};
use super::resolver::ArgumentResolver;
use crate::error::{BindingError, BindingErrorKind};
use crate::handler::{ArgumentValue, Binding, MethodParameter, NamedValue, ValueType};
use crate::request::RequestContext;

/// Where a named binding looks its value up.
pub trait NamedValueSource: Send + Sync + fmt::Debug {
    /// The binding settings, when `parameter` belongs to this source.
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue>;

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue>;

    fn missing_kind(&self) -> BindingErrorKind;
}

/// Shared logic of the named-value resolvers: name defaulting, default
/// values, required checks and type conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedValueResolver<S> {
    source: S,
}

impl<S: NamedValueSource> NamedValueResolver<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

/// Map-typed parameters without an explicit name bind the whole map and
/// belong to the map resolvers.
fn is_unnamed_map(parameter: &MethodParameter, named: &NamedValue) -> bool {
    named.name.is_none() && *parameter.value_type.nested() == ValueType::Map
}

impl<S: NamedValueSource> ArgumentResolver for NamedValueResolver<S> {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        self.source
            .named_value(parameter)
            .is_some_and(|named| !is_unnamed_map(parameter, named))
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let Some(named) = self.source.named_value(parameter) else {
            return Err(BindingError::new(
                &parameter.name,
                &parameter.value_type,
                BindingErrorKind::NoResolver,
            ));
        };
        let name = named.name.as_deref().unwrap_or(&parameter.name);
        bind_named_value(parameter, named, name, self.source.resolve_name(name, context), || {
            self.source.missing_kind()
        })
    }
}

pub(crate) fn bind_named_value(
    parameter: &MethodParameter,
    named: &NamedValue,
    name: &str,
    raw: Option<RawValue>,
    missing: impl FnOnce() -> BindingErrorKind,
) -> Result<ArgumentValue, BindingError> {
    let default = named.default_value.as_ref().map(|d| RawValue::single(d.as_str()));
    let raw = match raw {
        Some(raw) if raw.is_empty_string() && default.is_some() => default,
        None => default,
        found => found,
    };
    let value = match &raw {
        Some(raw) => convert(raw, &parameter.value_type).map_err(|reason| {
            BindingError::new(
                name,
                &parameter.value_type,
                BindingErrorKind::TypeMismatch {
                    value: raw.display(),
                    reason,
                },
            )
        })?,
        None => Value::Null,
    };
    if value.is_null() && named.required && !parameter.value_type.is_optional() {
        return Err(BindingError::new(name, &parameter.value_type, missing()));
    }
    Ok(if value.is_null() {
        ArgumentValue::Null
    } else {
        ArgumentValue::Value(value)
    })
}

/// `RequestParam`: query and form parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParamSource;

impl NamedValueSource for RequestParamSource {
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue> {
        match &parameter.binding {
            Binding::RequestParam(named) => Some(named),
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue> {
        let values = context.request().parameter_values(name);
        (!values.is_empty()).then(|| RawValue::Strings(values.into_iter().map(str::to_string).collect()))
    }

    fn missing_kind(&self) -> BindingErrorKind {
        BindingErrorKind::MissingRequestParam
    }
}

/// `PathVariable`: decoded URI template variables from the match.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathVariableSource;

impl NamedValueSource for PathVariableSource {
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue> {
        match &parameter.binding {
            Binding::PathVariable(named) => Some(named),
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue> {
        context.scratch().uri_variable(name).map(RawValue::single)
    }

    fn missing_kind(&self) -> BindingErrorKind {
        BindingErrorKind::MissingPathVariable
    }
}

/// `RequestHeader`: all values of the header, case-insensitive name.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestHeaderSource;

impl NamedValueSource for RequestHeaderSource {
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue> {
        match &parameter.binding {
            Binding::RequestHeader(named) => Some(named),
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue> {
        let values = context.request().header_values(name);
        (!values.is_empty()).then(|| RawValue::Strings(values.into_iter().map(str::to_string).collect()))
    }

    fn missing_kind(&self) -> BindingErrorKind {
        BindingErrorKind::MissingHeader
    }
}

/// `CookieValue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieValueSource;

impl NamedValueSource for CookieValueSource {
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue> {
        match &parameter.binding {
            Binding::CookieValue(named) => Some(named),
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue> {
        context.request().cookie(name).map(RawValue::single)
    }

    fn missing_kind(&self) -> BindingErrorKind {
        BindingErrorKind::MissingCookie
    }
}

/// `SessionAttribute`: a value stored in the request's session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAttributeSource;

impl NamedValueSource for SessionAttributeSource {
    fn named_value<'p>(&self, parameter: &'p MethodParameter) -> Option<&'p NamedValue> {
        match &parameter.binding {
            Binding::SessionAttribute(named) => Some(named),
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str, context: &RequestContext<'_>) -> Option<RawValue> {
        context
            .request()
            .session()
            .and_then(|session| session.attribute(name))
            .map(RawValue::Json)
    }

    fn missing_kind(&self) -> BindingErrorKind {
        BindingErrorKind::MissingSessionAttribute
    }
}

pub type RequestParamResolver = NamedValueResolver<RequestParamSource>;
pub type PathVariableResolver = NamedValueResolver<PathVariableSource>;
pub type RequestHeaderResolver = NamedValueResolver<RequestHeaderSource>;
pub type CookieValueResolver = NamedValueResolver<CookieValueSource>;
pub type SessionAttributeResolver = NamedValueResolver<SessionAttributeSource>;

/// Unnamed `RequestParam` maps: every parameter, first value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParamMapResolver;

impl ArgumentResolver for RequestParamMapResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        matches!(&parameter.binding, Binding::RequestParam(named) if is_unnamed_map(parameter, named))
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let mut map = Map::new();
        for (name, values) in context.request().parameter_map() {
            if let Some(first) = values.first() {
                map.insert(name.to_string(), Value::String((*first).to_string()));
            }
        }
        Ok(ArgumentValue::Value(Value::Object(map)))
    }
}

/// Unnamed `PathVariable` maps: all URI template variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathVariableMapResolver;

impl ArgumentResolver for PathVariableMapResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        matches!(&parameter.binding, Binding::PathVariable(named) if is_unnamed_map(parameter, named))
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let map: Map<String, Value> = context
            .scratch()
            .uri_variables
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.clone())))
            .collect();
        Ok(ArgumentValue::Value(Value::Object(map)))
    }
}

/// Unnamed `RequestHeader` maps: every header, first value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestHeaderMapResolver;

impl ArgumentResolver for RequestHeaderMapResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        matches!(&parameter.binding, Binding::RequestHeader(named) if is_unnamed_map(parameter, named))
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let mut map = Map::new();
        for name in context.request().headers().keys() {
            if let Some(value) = context.request().header(name.as_str()) {
                map.entry(name.as_str().to_string())
                    .or_insert_with(|| Value::String(value.to_string()));
            }
        }
        Ok(ArgumentValue::Value(Value::Object(map)))
    }
}

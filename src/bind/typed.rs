//! Type-driven resolvers and the catch-all for unannotated parameters.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::named::bind_named_value;
use super::resolver::ArgumentResolver;
use crate::error::{BindingError, BindingErrorKind};
use crate::handler::{ArgumentValue, Binding, MethodParameter, NamedValue, ValueType};
use crate::request::RequestContext;

fn unannotated(parameter: &MethodParameter, value_type: &ValueType) -> bool {
    parameter.binding == Binding::Unannotated && parameter.value_type.nested() == value_type
}

/// The request's HTTP method.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpMethodResolver;

impl ArgumentResolver for HttpMethodResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        unannotated(parameter, &ValueType::Method)
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        Ok(ArgumentValue::Method(context.request().method().clone()))
    }
}

/// All request headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpHeadersResolver;

impl ArgumentResolver for HttpHeadersResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        unannotated(parameter, &ValueType::Headers)
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        Ok(ArgumentValue::Headers(context.request().headers().clone()))
    }
}

/// The request's session; absent sessions fail unless the parameter is
/// optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionResolver;

impl ArgumentResolver for SessionResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        unannotated(parameter, &ValueType::Session)
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        match context.request().session() {
            Some(session) => Ok(ArgumentValue::Session(Arc::clone(session))),
            None if parameter.value_type.is_optional() => Ok(ArgumentValue::Null),
            None => Err(BindingError::new(
                &parameter.name,
                &parameter.value_type,
                BindingErrorKind::MissingSessionAttribute,
            )),
        }
    }
}

/// Catch-all for unannotated simple types: an optional request parameter
/// named after the parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleValueFallbackResolver;

impl ArgumentResolver for SimpleValueFallbackResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.binding == Binding::Unannotated && parameter.value_type.is_simple()
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let named = NamedValue::default().optional();
        let values = context.request().parameter_values(&parameter.name);
        let raw = (!values.is_empty())
            .then(|| super::RawValue::Strings(values.into_iter().map(str::to_string).collect()));
        bind_named_value(parameter, &named, &parameter.name, raw, || {
            BindingErrorKind::MissingRequestParam
        })
    }
}

/// Catch-all for unannotated structured types: a model object built from
/// every request parameter. Multi-valued parameters become arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelAttributeResolver;

impl ArgumentResolver for ModelAttributeResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.binding == Binding::Unannotated
            && matches!(parameter.value_type.nested(), ValueType::Json | ValueType::Map)
    }

    fn resolve_argument(
        &self,
        _parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let mut model = Map::new();
        for (name, values) in context.request().parameter_map() {
            let value = match values.as_slice() {
                [single] => Value::String((*single).to_string()),
                many => Value::Array(many.iter().map(|v| Value::String((*v).to_string())).collect()),
            };
            model.insert(name.to_string(), value);
        }
        Ok(ArgumentValue::Value(Value::Object(model)))
    }
}

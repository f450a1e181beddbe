use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{BindingError, BindingErrorKind};
use crate::handler::{ArgumentValue, Arguments, HandlerId, HandlerMethod, MethodParameter, ParameterSignature};
use crate::request::RequestContext;

/// Strategy that turns part of a request into one handler argument.
pub trait ArgumentResolver: Send + Sync + fmt::Debug {
    /// Whether this resolver handles `parameter`. Must depend on the
    /// parameter only; the answer is cached per parameter.
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool;

    /// Produce the argument for `parameter` from the request.
    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError>;
}

/// Ordered resolver chain; the first resolver that supports a parameter
/// resolves it.
///
/// Winners are cached per [`ParameterSignature`]. Concurrent first
/// requests may both scan; the chain is deterministic, so both find the
/// same winner and the cache stays consistent.
pub struct ArgumentResolvers {
    resolvers: Vec<Arc<dyn ArgumentResolver>>,
    cache: Option<DashMap<ParameterSignature, usize>>,
}

impl fmt::Debug for ArgumentResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentResolvers")
            .field("resolvers", &self.resolvers)
            .field("cached", &self.cache.as_ref().map(DashMap::len))
            .finish()
    }
}

impl ArgumentResolvers {
    #[must_use]
    pub fn new(resolvers: Vec<Arc<dyn ArgumentResolver>>) -> Self {
        Self {
            resolvers,
            cache: Some(DashMap::new()),
        }
    }

    /// Disable the winner cache; every call scans the chain.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    #[must_use]
    pub fn resolvers(&self) -> &[Arc<dyn ArgumentResolver>] {
        &self.resolvers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Index of the resolver that handles `parameter` of `handler`.
    #[must_use]
    pub fn resolver_index(&self, handler: &HandlerId, parameter: &MethodParameter) -> Option<usize> {
        let Some(cache) = &self.cache else {
            return self.scan(parameter);
        };
        let signature = ParameterSignature::new(handler, parameter);
        if let Some(hit) = cache.get(&signature) {
            return Some(*hit);
        }
        let found = self.scan(parameter)?;
        cache.entry(signature).or_insert(found);
        Some(found)
    }

    fn scan(&self, parameter: &MethodParameter) -> Option<usize> {
        self.resolvers.iter().position(|r| r.supports_parameter(parameter))
    }

    #[must_use]
    pub fn supports_parameter(&self, handler: &HandlerId, parameter: &MethodParameter) -> bool {
        self.resolver_index(handler, parameter).is_some()
    }

    /// Resolve one argument, adapting `Optional<T>` parameters.
    pub fn resolve_argument(
        &self,
        handler: &HandlerId,
        parameter: &MethodParameter,
        context: &RequestContext<'_>,
    ) -> Result<ArgumentValue, BindingError> {
        let index = self.resolver_index(handler, parameter).ok_or_else(|| {
            BindingError::new(&parameter.name, &parameter.value_type, BindingErrorKind::NoResolver)
        })?;
        let resolver = &self.resolvers[index];
        trace!(
            handler = %handler,
            parameter = %parameter.name,
            resolver = ?resolver,
            "Resolving argument"
        );
        let value = resolver.resolve_argument(parameter, context)?;
        Ok(if parameter.value_type.is_optional() {
            adapt_optional(value)
        } else {
            value
        })
    }

    /// Resolve every parameter of `handler` in declaration order.
    pub fn resolve_arguments(
        &self,
        handler: &HandlerMethod,
        context: &RequestContext<'_>,
    ) -> Result<Arguments, BindingError> {
        let mut values = Vec::with_capacity(handler.parameters().len());
        for parameter in handler.parameters().iter() {
            match self.resolve_argument(handler.id(), parameter, context) {
                Ok(value) => values.push(value),
                Err(e) => {
                    debug!(
                        handler = %handler.id(),
                        parameter = %parameter.name,
                        error = %e,
                        "Argument binding failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(Arguments::new(Arc::clone(handler.parameters()), values))
    }
}

/// Absence, `null` and empty lists become an explicitly empty optional.
fn adapt_optional(value: ArgumentValue) -> ArgumentValue {
    let inner = match value {
        ArgumentValue::Null | ArgumentValue::Optional(None) => None,
        ArgumentValue::Value(v) | ArgumentValue::Optional(Some(v)) => Some(v),
        other => return other,
    };
    match inner {
        None | Some(Value::Null) => ArgumentValue::Optional(None),
        Some(Value::Array(items)) if items.is_empty() => ArgumentValue::Optional(None),
        Some(v) => ArgumentValue::Optional(Some(v)),
    }
}

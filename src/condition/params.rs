use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::expression::NameValueExpression;
use super::RequestCondition;
use crate::error::DescriptorError;
use crate::request::HttpRequest;

/// Request-parameter condition (query string and form fields).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamsCondition {
    expressions: BTreeSet<NameValueExpression>,
}

impl ParamsCondition {
    pub fn parse<S: AsRef<str>>(expressions: &[S]) -> Result<Self, DescriptorError> {
        let expressions = expressions
            .iter()
            .map(|e| NameValueExpression::parse(e.as_ref(), false))
            .collect::<Result<_, _>>()?;
        Ok(Self { expressions })
    }

    pub fn expressions(&self) -> impl Iterator<Item = &NameValueExpression> {
        self.expressions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Expressions the request does not satisfy, rendered.
    #[must_use]
    pub fn failing_expressions(&self, request: &HttpRequest) -> Vec<String> {
        self.expressions
            .iter()
            .filter(|e| !e.matches(request.parameter(e.name())))
            .map(ToString::to_string)
            .collect()
    }
}

impl RequestCondition for ParamsCondition {
    fn combine(&self, other: &Self) -> Self {
        Self {
            expressions: self.expressions.union(&other.expressions).cloned().collect(),
        }
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Self> {
        self.expressions
            .iter()
            .all(|e| e.matches(request.parameter(e.name())))
            .then(|| self.clone())
    }

    fn compare_to(&self, other: &Self, _request: &HttpRequest) -> Ordering {
        other
            .len()
            .cmp(&self.len())
            .then_with(|| value_match_count(&other.expressions).cmp(&value_match_count(&self.expressions)))
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl fmt::Display for ParamsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(&self.expressions, f)
    }
}

/// Number of non-negated expressions that require a concrete value.
pub(crate) fn value_match_count(expressions: &BTreeSet<NameValueExpression>) -> usize {
    expressions
        .iter()
        .filter(|e| e.value().is_some() && !e.is_negated())
        .count()
}

pub(crate) fn render(
    expressions: &BTreeSet<NameValueExpression>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let rendered: Vec<String> = expressions.iter().map(ToString::to_string).collect();
    write!(f, "[{}]", rendered.join(" && "))
}

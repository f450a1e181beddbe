use http::header::{ACCEPT, CONTENT_TYPE};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::expression::NameValueExpression;
use super::params::{render, value_match_count};
use super::RequestCondition;
use crate::error::DescriptorError;
use crate::request::HttpRequest;

/// Request-header condition. Header names are matched case-insensitively.
///
/// `Accept` and `Content-Type` expressions never end up here: the mapping
/// builder turns them into produces and consumes expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeadersCondition {
    expressions: BTreeSet<NameValueExpression>,
}

impl HeadersCondition {
    pub fn parse<S: AsRef<str>>(expressions: &[S]) -> Result<Self, DescriptorError> {
        let mut parsed = BTreeSet::new();
        for raw in expressions {
            let expression = NameValueExpression::parse(raw.as_ref(), true)?;
            if !is_media_type_header(expression.name()) {
                parsed.insert(expression);
            }
        }
        Ok(Self {
            expressions: parsed,
        })
    }

    pub fn expressions(&self) -> impl Iterator<Item = &NameValueExpression> {
        self.expressions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }
}

/// `Accept` / `Content-Type`, which are expressed as produces / consumes.
pub(crate) fn is_media_type_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(ACCEPT.as_str()) || name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
}

impl RequestCondition for HeadersCondition {
    fn combine(&self, other: &Self) -> Self {
        Self {
            expressions: self.expressions.union(&other.expressions).cloned().collect(),
        }
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Self> {
        self.expressions
            .iter()
            .all(|e| e.matches(request.header(e.name())))
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

impl fmt::Display for HeadersCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(&self.expressions, f)
    }
}

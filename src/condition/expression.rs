use std::fmt;

use crate::error::DescriptorError;
use crate::media::MediaType;

/// A parsed `name`, `!name`, `name=value` or `name!=value` expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameValueExpression {
    name: String,
    value: Option<String>,
    negated: bool,
}

impl NameValueExpression {
    /// Parse an expression. With `case_insensitive_name` the name is
    /// lower-cased (header names).
    pub fn parse(expression: &str, case_insensitive_name: bool) -> Result<Self, DescriptorError> {
        let invalid = |reason: &'static str| DescriptorError::InvalidExpression {
            expression: expression.to_string(),
            reason,
        };
        let trimmed = expression.trim();
        let (name, value, negated) = if let Some((name, value)) = trimmed.split_once("!=") {
            (name, Some(value), true)
        } else if let Some((name, value)) = trimmed.split_once('=') {
            (name, Some(value), false)
        } else if let Some(name) = trimmed.strip_prefix('!') {
            (name, None, true)
        } else {
            (trimmed, None, false)
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("missing name"));
        }
        if name.starts_with('!') && value.is_some() {
            return Err(invalid("a value expression cannot also negate the name"));
        }
        let name = if case_insensitive_name {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        };
        Ok(Self {
            name,
            value: value.map(|v| v.trim().to_string()),
            negated,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Evaluate against the first value of the named request attribute.
    #[must_use]
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let is_match = match &self.value {
            Some(expected) => actual == Some(expected.as_str()),
            None => actual.is_some(),
        };
        is_match != self.negated
    }
}

impl fmt::Display for NameValueExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.negated) {
            (Some(value), true) => write!(f, "{}!={}", self.name, value),
            (Some(value), false) => write!(f, "{}={}", self.name, value),
            (None, true) => write!(f, "!{}", self.name),
            (None, false) => f.write_str(&self.name),
        }
    }
}

/// A `type/subtype` or `!type/subtype` expression of a consumes or produces
/// condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaTypeExpression {
    media_type: MediaType,
    negated: bool,
}

impl MediaTypeExpression {
    pub fn parse(expression: &str) -> Result<Self, DescriptorError> {
        let trimmed = expression.trim();
        let (raw, negated) = match trimmed.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };
        let media_type = MediaType::parse(raw).map_err(DescriptorError::InvalidMediaType)?;
        Ok(Self {
            media_type,
            negated,
        })
    }

    #[must_use]
    pub fn new(media_type: MediaType, negated: bool) -> Self {
        Self {
            media_type,
            negated,
        }
    }

    #[must_use]
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Consumes semantics: the expression includes the request content type
    /// and its declared parameters agree.
    #[must_use]
    pub fn matches_content_type(&self, content_type: &MediaType) -> bool {
        let is_match = self.media_type.includes(content_type)
            && self.media_type.parameters_agree_with(content_type);
        is_match != self.negated
    }

    /// Produces semantics: compatible with one of the acceptable types and
    /// the declared parameters agree.
    #[must_use]
    pub fn matches_acceptable(&self, acceptable: &[MediaType]) -> bool {
        let is_match = acceptable.iter().any(|accepted| {
            self.media_type.is_compatible_with(accepted)
                && self.media_type.parameters_agree_with(accepted)
        });
        is_match != self.negated
    }
}

impl fmt::Display for MediaTypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        write!(f, "{}", self.media_type)
    }
}

/// Sort expressions by media-type specificity (stable), dropping duplicates.
pub(crate) fn sort_expressions(expressions: &mut Vec<MediaTypeExpression>) {
    let mut sorted: Vec<MediaTypeExpression> = Vec::with_capacity(expressions.len());
    for expression in expressions.drain(..) {
        if sorted.contains(&expression) {
            continue;
        }
        let position = sorted
            .iter()
            .position(|e| {
                expression.media_type.compare_specificity(&e.media_type)
                    == std::cmp::Ordering::Less
            })
            .unwrap_or(sorted.len());
        sorted.insert(position, expression);
    }
    *expressions = sorted;
}

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::expression::{sort_expressions, MediaTypeExpression};
use super::RequestCondition;
use crate::media::MediaType;
use crate::request::HttpRequest;

/// Consumable media types, matched against the request `Content-Type`.
///
/// `body_required` (default `true`) controls whether a request without a
/// body still has to match: when the handler's body parameter is optional
/// the registry flips it to `false` and body-less requests match the empty
/// condition.
#[derive(Debug, Clone)]
pub struct ConsumesCondition {
    expressions: Vec<MediaTypeExpression>,
    body_required: bool,
}

impl Default for ConsumesCondition {
    fn default() -> Self {
        Self {
            expressions: Vec::new(),
            body_required: true,
        }
    }
}

impl ConsumesCondition {
    #[must_use]
    pub fn new(mut expressions: Vec<MediaTypeExpression>) -> Self {
        sort_expressions(&mut expressions);
        Self {
            expressions,
            body_required: true,
        }
    }

    #[must_use]
    pub fn with_body_required(mut self, body_required: bool) -> Self {
        self.body_required = body_required;
        self
    }

    #[must_use]
    pub fn is_body_required(&self) -> bool {
        self.body_required
    }

    #[must_use]
    pub fn expressions(&self) -> &[MediaTypeExpression] {
        &self.expressions
    }

    /// Non-negated media types, most specific first.
    #[must_use]
    pub fn consumable_media_types(&self) -> Vec<MediaType> {
        self.expressions
            .iter()
            .filter(|e| !e.is_negated())
            .map(|e| e.media_type().clone())
            .collect()
    }
}

impl RequestCondition for ConsumesCondition {
    /// The method-level condition replaces this one when it is non-empty.
    fn combine(&self, other: &Self) -> Self {
        if other.expressions.is_empty() {
            self.clone()
        } else {
            other.clone()
        }
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Self> {
        if self.expressions.is_empty() {
            return Some(self.clone());
        }
        if !self.body_required && !request.has_body() {
            return Some(Self::default().with_body_required(false));
        }
        let content_type = match request.content_type() {
            None => MediaType::application_octet_stream(),
            Some(Ok(content_type)) => content_type,
            Some(Err(_)) => return None,
        };
        let matched: Vec<MediaTypeExpression> = self
            .expressions
            .iter()
            .filter(|e| e.matches_content_type(&content_type))
            .cloned()
            .collect();
        (!matched.is_empty()).then(|| Self {
            expressions: matched,
            body_required: self.body_required,
        })
    }

    /// Compares the most specific expression of each; empty loses.
    fn compare_to(&self, other: &Self, _request: &HttpRequest) -> Ordering {
        match (self.expressions.first(), other.expressions.first()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(mine), Some(theirs)) => mine.media_type().compare_specificity(theirs.media_type()),
        }
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl PartialEq for ConsumesCondition {
    fn eq(&self, other: &Self) -> bool {
        self.expressions.len() == other.expressions.len()
            && self.expressions.iter().all(|e| other.expressions.contains(e))
    }
}

impl Eq for ConsumesCondition {}

impl Hash for ConsumesCondition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut rendered: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        rendered.sort();
        rendered.hash(state);
    }
}

impl fmt::Display for ConsumesCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", rendered.join(" || "))
    }
}

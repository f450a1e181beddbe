use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::expression::{sort_expressions, MediaTypeExpression};
use super::RequestCondition;
use crate::media::{ContentNegotiator, HeaderContentNegotiator, MediaType};
use crate::request::HttpRequest;

/// Producible media types, matched against the request's acceptable types.
///
/// The acceptable types come from the condition's [`ContentNegotiator`]
/// and are resolved once per request.
#[derive(Debug, Clone)]
pub struct ProducesCondition {
    expressions: Vec<MediaTypeExpression>,
    negotiator: Arc<dyn ContentNegotiator>,
}

impl Default for ProducesCondition {
    fn default() -> Self {
        Self::empty(Arc::new(HeaderContentNegotiator))
    }
}

impl ProducesCondition {
    #[must_use]
    pub fn new(mut expressions: Vec<MediaTypeExpression>, negotiator: Arc<dyn ContentNegotiator>) -> Self {
        sort_expressions(&mut expressions);
        Self {
            expressions,
            negotiator,
        }
    }

    #[must_use]
    pub fn empty(negotiator: Arc<dyn ContentNegotiator>) -> Self {
        Self {
            expressions: Vec::new(),
            negotiator,
        }
    }

    #[must_use]
    pub fn expressions(&self) -> &[MediaTypeExpression] {
        &self.expressions
    }

    #[must_use]
    pub fn negotiator(&self) -> &Arc<dyn ContentNegotiator> {
        &self.negotiator
    }

    /// Non-negated media types, most specific first.
    #[must_use]
    pub fn producible_media_types(&self) -> Vec<MediaType> {
        self.expressions
            .iter()
            .filter(|e| !e.is_negated())
            .map(|e| e.media_type().clone())
            .collect()
    }

    /// Expressions used for ranking; an empty condition ranks as `*/*`.
    fn expressions_to_compare(&self) -> Vec<MediaTypeExpression> {
        if self.expressions.is_empty() {
            vec![MediaTypeExpression::new(MediaType::all(), false)]
        } else {
            self.expressions.clone()
        }
    }
}

fn index_of_equal(expressions: &[MediaTypeExpression], accepted: &MediaType) -> Option<usize> {
    expressions
        .iter()
        .position(|e| e.media_type().equals_type_and_subtype(accepted))
}

fn index_of_included(expressions: &[MediaTypeExpression], accepted: &MediaType) -> Option<usize> {
    expressions
        .iter()
        .position(|e| accepted.includes(e.media_type()))
}

fn compare_matching(
    mine: &[MediaTypeExpression],
    my_index: Option<usize>,
    theirs: &[MediaTypeExpression],
    their_index: Option<usize>,
) -> Ordering {
    match (my_index, their_index) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
        (Some(i), Some(j)) => mine[i]
            .media_type()
            .compare_specificity(theirs[j].media_type()),
    }
}

impl RequestCondition for ProducesCondition {
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
        let acceptable = request.acceptable_media_types(self.negotiator.as_ref()).ok()?;
        let matched: Vec<MediaTypeExpression> = self
            .expressions
            .iter()
            .filter(|e| e.matches_acceptable(acceptable))
            .cloned()
            .collect();
        if !matched.is_empty() {
            return Some(Self {
                expressions: matched,
                negotiator: Arc::clone(&self.negotiator),
            });
        }
        MediaType::all()
            .is_present_in(acceptable)
            .then(|| Self::empty(Arc::clone(&self.negotiator)))
    }

    /// Ranked by the request's acceptable types, best first: a condition
    /// declaring a type equal to an accepted type wins, then one declaring a
    /// type the accepted type includes.
    fn compare_to(&self, other: &Self, request: &HttpRequest) -> Ordering {
        let Ok(acceptable) = request.acceptable_media_types(self.negotiator.as_ref()) else {
            return Ordering::Equal;
        };
        let mine = self.expressions_to_compare();
        let theirs = other.expressions_to_compare();
        for accepted in acceptable {
            let result = compare_matching(
                &mine,
                index_of_equal(&mine, accepted),
                &theirs,
                index_of_equal(&theirs, accepted),
            );
            if result != Ordering::Equal {
                return result;
            }
            let result = compare_matching(
                &mine,
                index_of_included(&mine, accepted),
                &theirs,
                index_of_included(&theirs, accepted),
            );
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }

    fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl PartialEq for ProducesCondition {
    fn eq(&self, other: &Self) -> bool {
        self.expressions.len() == other.expressions.len()
            && self.expressions.iter().all(|e| other.expressions.contains(e))
    }
}

impl Eq for ProducesCondition {}

impl Hash for ProducesCondition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut rendered: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        rendered.sort();
        rendered.hash(state);
    }
}

impl fmt::Display for ProducesCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", rendered.join(" || "))
    }
}

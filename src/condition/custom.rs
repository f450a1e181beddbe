use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::RequestCondition;
use crate::request::HttpRequest;

/// Host-supplied condition stored in the opaque slot of a mapping.
///
/// Implementations combine and compare only with their own type; use
/// [`CustomCondition::as_any`] to downcast `other`. The `Display` rendering
/// is the condition's identity (equality and hashing go through it).
pub trait CustomCondition: Send + Sync + fmt::Debug + fmt::Display + Any {
    fn as_any(&self) -> &dyn Any;

    fn combine(&self, other: &dyn CustomCondition) -> Arc<dyn CustomCondition>;

    fn matching_condition(&self, request: &HttpRequest) -> Option<Arc<dyn CustomCondition>>;

    fn compare_to(&self, other: &dyn CustomCondition, request: &HttpRequest) -> Ordering;
}

/// Optional [`CustomCondition`] slot. A present condition outranks an
/// absent one.
#[derive(Debug, Clone, Default)]
pub struct CustomConditionHolder(Option<Arc<dyn CustomCondition>>);

impl CustomConditionHolder {
    #[must_use]
    pub fn new(condition: Arc<dyn CustomCondition>) -> Self {
        Self(Some(condition))
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Arc<dyn CustomCondition>> {
        self.0.as_ref()
    }
}

impl RequestCondition for CustomConditionHolder {
    fn combine(&self, other: &Self) -> Self {
        match (&self.0, &other.0) {
            (Some(mine), Some(theirs)) => Self(Some(mine.combine(theirs.as_ref()))),
            (Some(mine), None) => Self(Some(Arc::clone(mine))),
            (None, Some(theirs)) => Self(Some(Arc::clone(theirs))),
            (None, None) => Self(None),
        }
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Self> {
        match &self.0 {
            None => Some(Self(None)),
            Some(condition) => condition.matching_condition(request).map(|c| Self(Some(c))),
        }
    }

    fn compare_to(&self, other: &Self, request: &HttpRequest) -> Ordering {
        match (&self.0, &other.0) {
            (Some(mine), Some(theirs)) => mine.compare_to(theirs.as_ref(), request),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl PartialEq for CustomConditionHolder {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for CustomConditionHolder {}

impl Hash for CustomConditionHolder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for CustomConditionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(condition) => write!(f, "{condition}"),
            None => Ok(()),
        }
    }
}

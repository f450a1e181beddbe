//! # Condition Module
//!
//! Single-facet request predicates. A mapping is the conjunction of one
//! condition of each kind:
//!
//! | Condition | Facet | `combine` |
//! |---|---|---|
//! | [`PathCondition`] | request path | cartesian pattern concatenation |
//! | [`RequestMethodsCondition`] | HTTP method | union |
//! | [`ParamsCondition`] | query / form parameters | union |
//! | [`HeadersCondition`] | headers | union |
//! | [`ConsumesCondition`] | `Content-Type` | method level overrides |
//! | [`ProducesCondition`] | `Accept` | method level overrides |
//! | [`CustomConditionHolder`] | host defined | delegated |
//!
//! Conditions are immutable. `matching_condition` never mutates anything;
//! it returns the narrowed condition (only the expressions that matched) or
//! `None`. `compare_to` is meant for two conditions that both matched the
//! same request; `Ordering::Less` means `self` is more specific.

mod consumes;
mod custom;
mod expression;
mod headers;
mod methods;
mod params;
mod path;
mod produces;
#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fmt;

use crate::request::HttpRequest;

pub use consumes::ConsumesCondition;
pub use custom::{CustomCondition, CustomConditionHolder};
pub use expression::{MediaTypeExpression, NameValueExpression};
pub use headers::HeadersCondition;
pub use methods::RequestMethodsCondition;
pub use params::ParamsCondition;
pub use path::{PathCondition, PathStrategy};
pub use produces::ProducesCondition;

pub(crate) use headers::is_media_type_header;
pub(crate) use methods::sort_methods;
pub(crate) use path::insertion_sort;

/// Combinable, request-matchable, comparable predicate over one request
/// facet.
pub trait RequestCondition: Sized + Clone + fmt::Display {
    /// Merge a type-level condition (`self`) with a method-level one.
    fn combine(&self, other: &Self) -> Self;

    /// The narrowed condition that matched, or `None`.
    fn matching_condition(&self, request: &HttpRequest) -> Option<Self>;

    /// Specificity for `request`; `Less` means `self` is preferred.
    fn compare_to(&self, other: &Self, request: &HttpRequest) -> Ordering;

    fn is_empty(&self) -> bool;
}

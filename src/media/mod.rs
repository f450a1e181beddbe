//! # Media Type Module
//!
//! Parsed `type/subtype;params` values and the content-negotiation
//! collaborator that turns a request into an ordered list of acceptable
//! types.
//!
//! ## Ordering
//!
//! Two orderings are used throughout the crate:
//!
//! - **Specificity**: concrete types before wildcards, and for identical
//!   type/subtype the higher quality and then more parameters first.
//! - **Quality**: higher `q` first, then the specificity tie-breakers.
//!
//! Acceptable types are sorted by specificity, ties broken by quality, with
//! [`sort_by_specificity_and_quality`].

mod core;
mod negotiation;

pub use core::{
    most_specific_media_type, sort_by_specificity_and_quality, InvalidMediaType, MediaType,
};
pub use negotiation::{ContentNegotiator, FixedContentNegotiator, HeaderContentNegotiator};

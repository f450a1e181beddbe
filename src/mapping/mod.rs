//! # Mapping Module
//!
//! [`MappingDescriptor`] aggregates one condition of every kind into the
//! complete matching contract of a handler. Descriptors are produced by
//! [`MappingDescriptorBuilder`] and never change afterwards; "changing" one
//! means `mutate()`, adjust the builder, `build()` again.
//!
//! ```text
//! MappingDescriptor::paths(&["/items/{id}"])
//!     .methods(&[Method::GET])
//!     .produces(&["application/json"])
//!     .build()?
//! ```
//!
//! Matching evaluates methods first (cheapest to fail) and path last; the
//! registry has already pre-filtered by path for direct hits.

mod builder;
mod descriptor;

pub use builder::{MappingDescriptorBuilder, MappingOptions};
pub use descriptor::MappingDescriptor;

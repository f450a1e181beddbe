//! # Registry Module
//!
//! Holds every descriptor → handler mapping and the indexes the dispatcher
//! reads on the hot path:
//!
//! - a **direct-path index** of literal patterns, checked first
//! - the full registration list, scanned when direct hits do not match
//! - a **name index** (`IC#show`-style default names or explicit names)
//!
//! ## Concurrency
//!
//! The indexes live in an immutable [`RegistrySnapshot`] behind an
//! `ArcSwap`. Lookups load the current snapshot without locking; writers
//! take a mutex, copy the snapshot, modify the copy and swap it in.
//!
//! ```text
//! let registry = Registry::default();
//! registry.register(
//!     registry.mapping(&["/items/{id}"]).methods(&[Method::GET]).build()?,
//!     show_item_handler,
//! )?;
//! ```

mod core;

pub use core::{default_mapping_name, Registration, Registry, RegistrySnapshot};

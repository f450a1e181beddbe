//! # Dispatcher Module
//!
//! Selects the handler for a request and runs the full pipeline around it.
//!
//! ## Request Flow
//!
//! 1. **Lookup**: registrations with a literal pattern equal to the path
//!    are tried first; when none of them matches, every registration is
//!    scanned
//! 2. **Rank**: matching descriptors are narrowed to the request and
//!    ordered with `compare_to`; when the best two rank equal the request
//!    fails with `AmbiguousMapping` instead of picking by registration order
//! 3. **Bind**: the argument resolver chain produces one value per
//!    parameter
//! 4. **Invoke**: the handler runs; panics are caught and logged
//! 5. **Write**: the return-value handler chain turns the result into the
//!    response
//!
//! ## No Match
//!
//! When no registration matches, the registrations whose path matches are
//! diagnosed condition by condition, each step over the survivors of the
//! previous one:
//!
//! | Failing condition | Result | Status |
//! |---|---|---|
//! | methods | `MethodNotAllowed` (or an `OPTIONS` answer) | 405 / 200 |
//! | consumes | `UnsupportedMediaType` | 415 |
//! | produces | `NotAcceptable` | 406 |
//! | params | `UnsatisfiedParams` | 400 |
//! | anything else | `NoRouteFound` | 404 |
//!
//! ## OPTIONS
//!
//! An `OPTIONS` request for a mapped path with no explicit `OPTIONS`
//! mapping gets `200` with an `Allow` header listing the declared methods,
//! `HEAD` when `GET` is declared, and `OPTIONS`. When the path declares no
//! methods at all, every method but `TRACE` is allowed.
//!
//! ## Logging
//!
//! Matches are logged at `debug!`, ambiguity and handler panics at
//! `error!`, lookups slower than `slow_lookup_threshold_us` at `warn!`.

mod core;
mod diagnosis;
mod options;
#[cfg(test)]
mod tests;

pub use core::{Dispatcher, DispatcherBuilder, HandlerMatch, Lookup};
pub use options::OptionsResponder;

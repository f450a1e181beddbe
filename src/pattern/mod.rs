//! # Pattern Module
//!
//! The path-matching collaborator. Two strategies are provided and a
//! registry uses exactly one of them:
//!
//! - [`PathPattern`]: patterns parsed once at build time into segment
//!   matchers. `**` / `{*var}` are only allowed at the end of a pattern.
//! - [`PathMatcher`]: patterns kept as strings and interpreted by a matcher
//!   object. The default [`TemplatePathMatcher`] supports `?`, `*`, `**`
//!   anywhere, `{var}` and `{var:regex}`, and caches compiled templates.
//!
//! Both strategies match segment by segment and return raw captures that
//! are percent-decoded before they are handed to callers.
//!
//! ## Specificity
//!
//! `compare_specificity` returns [`std::cmp::Ordering::Less`] when the first
//! pattern is *more specific* (it should be preferred).

mod parsed;
mod segment;
mod template;

use std::cmp::Ordering;
use std::fmt;

use crate::request::ParamVec;

pub use parsed::PathPattern;
pub use template::TemplatePathMatcher;

pub(crate) use segment::has_template_syntax;

/// A pattern that could not be compiled or combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

impl PatternError {
    pub(crate) fn new(pattern: &str, reason: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path pattern '{}': {}", self.pattern, self.reason)
    }
}

impl std::error::Error for PatternError {}

/// Result of a successful [`PathMatcher::match_and_extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Decoded template variables in pattern order
    pub variables: ParamVec,
    /// The portion of the path the pattern matched
    pub matched: String,
}

/// String-pattern path matching strategy.
pub trait PathMatcher: Send + Sync + fmt::Debug {
    /// Whether `path` contains template syntax (as opposed to a literal path).
    fn is_pattern(&self, path: &str) -> bool {
        has_template_syntax(path)
    }

    /// Check a pattern at build time so that bad templates fail registration
    /// instead of silently never matching.
    fn validate(&self, _pattern: &str) -> Result<(), PatternError> {
        Ok(())
    }

    fn matches(&self, pattern: &str, path: &str) -> bool;

    /// Match and extract the (decoded) template variables.
    fn match_and_extract(&self, pattern: &str, path: &str) -> Option<PathMatch>;

    /// Combine a type-level and a method-level pattern.
    fn combine(&self, first: &str, second: &str) -> Result<String, PatternError>;

    /// Order two patterns by how specifically they match `path`.
    fn compare_specificity(&self, first: &str, second: &str, path: &str) -> Ordering;
}

/// Join two patterns with exactly one separator between them.
pub(crate) fn concat_patterns(first: &str, second: &str) -> String {
    match (first.ends_with('/'), second.starts_with('/')) {
        (true, true) => format!("{first}{}", &second[1..]),
        (false, false) => format!("{first}/{second}"),
        _ => format!("{first}{second}"),
    }
}

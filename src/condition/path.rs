use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::DescriptorError;
use crate::pattern::{PathMatch, PathMatcher, PathPattern};

/// Which path representation a descriptor (and a registry) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStrategy {
    /// Patterns parsed into [`PathPattern`]s at build time
    #[default]
    Parsed,
    /// String patterns interpreted by a [`PathMatcher`]
    Template,
}

impl fmt::Display for PathStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStrategy::Parsed => f.write_str("parsed"),
            PathStrategy::Template => f.write_str("template"),
        }
    }
}

/// Path patterns of a mapping, in one of the two strategies.
///
/// Holding the strategy in the variant makes "exactly one representation"
/// a property of the type. Patterns are a set: duplicates are dropped and
/// they are kept sorted by text, except in a narrowed condition returned by
/// [`PathCondition::matching_condition`], which lists the matching patterns
/// best-first for the request path.
#[derive(Debug, Clone)]
pub enum PathCondition {
    Parsed {
        patterns: Vec<PathPattern>,
        trailing_slash_match: bool,
    },
    Template {
        patterns: Vec<String>,
        matcher: Arc<dyn PathMatcher>,
        trailing_slash_match: bool,
    },
}

fn with_leading_slash(pattern: &str) -> String {
    if pattern.is_empty() || pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{pattern}")
    }
}

impl PathCondition {
    pub fn parsed<S: AsRef<str>>(patterns: &[S], trailing_slash_match: bool) -> Result<Self, DescriptorError> {
        let mut parsed = patterns
            .iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DescriptorError::InvalidPattern)?;
        parsed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        parsed.dedup();
        Ok(PathCondition::Parsed {
            patterns: parsed,
            trailing_slash_match,
        })
    }

    pub fn template<S: AsRef<str>>(
        patterns: &[S],
        matcher: Arc<dyn PathMatcher>,
        trailing_slash_match: bool,
    ) -> Result<Self, DescriptorError> {
        let mut normalized = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = with_leading_slash(pattern.as_ref());
            matcher.validate(&pattern).map_err(DescriptorError::InvalidPattern)?;
            normalized.push(pattern);
        }
        normalized.sort();
        normalized.dedup();
        Ok(PathCondition::Template {
            patterns: normalized,
            matcher,
            trailing_slash_match,
        })
    }

    #[must_use]
    pub fn strategy(&self) -> PathStrategy {
        match self {
            PathCondition::Parsed { .. } => PathStrategy::Parsed,
            PathCondition::Template { .. } => PathStrategy::Template,
        }
    }

    /// Pattern strings in condition order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            PathCondition::Parsed { patterns, .. } => patterns.iter().map(PathPattern::as_str).collect(),
            PathCondition::Template { patterns, .. } => patterns.iter().map(String::as_str).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            PathCondition::Parsed { patterns, .. } => patterns.is_empty(),
            PathCondition::Template { patterns, .. } => patterns.is_empty(),
        }
    }

    /// Patterns without template syntax, usable as direct lookup keys. An
    /// empty condition maps `""` and `"/"`.
    #[must_use]
    pub fn direct_paths(&self) -> Vec<String> {
        if self.is_empty() {
            return vec![String::new(), "/".to_string()];
        }
        match self {
            PathCondition::Parsed { patterns, .. } => patterns
                .iter()
                .filter(|p| !p.has_pattern_syntax())
                .map(|p| p.as_str().to_string())
                .collect(),
            PathCondition::Template { patterns, matcher, .. } => patterns
                .iter()
                .filter(|p| !matcher.is_pattern(p))
                .cloned()
                .collect(),
        }
    }

    fn trailing_slash_match(&self) -> bool {
        match self {
            PathCondition::Parsed {
                trailing_slash_match,
                ..
            }
            | PathCondition::Template {
                trailing_slash_match,
                ..
            } => *trailing_slash_match,
        }
    }

    /// The path to retry with when trailing-slash matching applies.
    fn without_trailing_slash<'p>(&self, pattern: &str, path: &'p str) -> Option<&'p str> {
        (self.trailing_slash_match() && path.len() > 1 && path.ends_with('/') && !pattern.ends_with('/'))
            .then(|| &path[..path.len() - 1])
    }

    /// Combine with a method-level condition: the cartesian product of the
    /// two pattern sets, or whichever side is non-empty.
    pub fn combine(&self, other: &Self) -> Result<Self, DescriptorError> {
        if self.strategy() != other.strategy() {
            return Err(DescriptorError::StrategyMismatch {
                expected: self.strategy(),
                found: other.strategy(),
            });
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        match (self, other) {
            (
                PathCondition::Parsed {
                    patterns,
                    trailing_slash_match,
                },
                PathCondition::Parsed {
                    patterns: method_level,
                    ..
                },
            ) => {
                let mut combined = Vec::with_capacity(patterns.len() * method_level.len());
                for first in patterns {
                    for second in method_level {
                        combined.push(first.combine(second).map_err(DescriptorError::InvalidPattern)?);
                    }
                }
                combined.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                combined.dedup();
                Ok(PathCondition::Parsed {
                    patterns: combined,
                    trailing_slash_match: *trailing_slash_match,
                })
            }
            (
                PathCondition::Template {
                    patterns,
                    matcher,
                    trailing_slash_match,
                },
                PathCondition::Template {
                    patterns: method_level,
                    ..
                },
            ) => {
                let mut combined = Vec::with_capacity(patterns.len() * method_level.len());
                for first in patterns {
                    for second in method_level {
                        combined.push(matcher.combine(first, second).map_err(DescriptorError::InvalidPattern)?);
                    }
                }
                combined.sort();
                combined.dedup();
                Ok(PathCondition::Template {
                    patterns: combined,
                    matcher: Arc::clone(matcher),
                    trailing_slash_match: *trailing_slash_match,
                })
            }
            _ => Err(DescriptorError::StrategyMismatch {
                expected: self.strategy(),
                found: other.strategy(),
            }),
        }
    }

    /// Narrow to the patterns matching `path`, sorted best-first.
    #[must_use]
    pub fn matching_condition(&self, path: &str) -> Option<Self> {
        if self.is_empty() {
            return (path.is_empty() || path == "/").then(|| self.clone());
        }
        match self {
            PathCondition::Parsed {
                patterns,
                trailing_slash_match,
            } => {
                let mut matched: Vec<PathPattern> = patterns
                    .iter()
                    .filter(|p| {
                        p.matches(path)
                            || self
                                .without_trailing_slash(p.as_str(), path)
                                .is_some_and(|trimmed| p.matches(trimmed))
                    })
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                insertion_sort(&mut matched, |a, b| a.compare_specificity(b));
                Some(PathCondition::Parsed {
                    patterns: matched,
                    trailing_slash_match: *trailing_slash_match,
                })
            }
            PathCondition::Template {
                patterns,
                matcher,
                trailing_slash_match,
            } => {
                let mut matched: Vec<String> = patterns
                    .iter()
                    .filter(|p| {
                        matcher.matches(p, path)
                            || self
                                .without_trailing_slash(p, path)
                                .is_some_and(|trimmed| matcher.matches(p, trimmed))
                    })
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                insertion_sort(&mut matched, |a, b| matcher.compare_specificity(a, b, path));
                Some(PathCondition::Template {
                    patterns: matched,
                    matcher: Arc::clone(matcher),
                    trailing_slash_match: *trailing_slash_match,
                })
            }
        }
    }

    /// Compare two narrowed conditions pattern by pattern; when one runs out
    /// first, the one with more patterns wins.
    #[must_use]
    pub fn compare_to(&self, other: &Self, path: &str) -> Ordering {
        let ordering = match (self, other) {
            (PathCondition::Parsed { patterns: mine, .. }, PathCondition::Parsed { patterns: theirs, .. }) => mine
                .iter()
                .zip(theirs)
                .map(|(a, b)| a.compare_specificity(b))
                .find(|o| *o != Ordering::Equal),
            (
                PathCondition::Template {
                    patterns: mine,
                    matcher,
                    ..
                },
                PathCondition::Template { patterns: theirs, .. },
            ) => mine
                .iter()
                .zip(theirs)
                .map(|(a, b)| matcher.compare_specificity(a, b, path))
                .find(|o| *o != Ordering::Equal),
            _ => return Ordering::Equal,
        };
        ordering.unwrap_or_else(|| {
            let (mine, theirs) = (self.patterns().len(), other.patterns().len());
            theirs.cmp(&mine)
        })
    }

    /// Extract the decoded template variables of `pattern` from `path`.
    #[must_use]
    pub fn extract(&self, pattern: &str, path: &str) -> Option<PathMatch> {
        let attempt = |candidate: &str| match self {
            PathCondition::Parsed { patterns, .. } => patterns
                .iter()
                .find(|p| p.as_str() == pattern)
                .and_then(|p| p.match_and_extract(candidate)),
            PathCondition::Template { matcher, .. } => matcher.match_and_extract(pattern, candidate),
        };
        attempt(path).or_else(|| {
            self.without_trailing_slash(pattern, path)
                .and_then(|trimmed| attempt(trimmed))
        })
    }
}

/// Stable insertion sort for comparators that are not total orders.
pub(crate) fn insertion_sort<T>(items: &mut [T], mut compare: impl FnMut(&T, &T) -> Ordering) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j], &items[j - 1]) == Ordering::Less {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

impl PartialEq for PathCondition {
    fn eq(&self, other: &Self) -> bool {
        self.strategy() == other.strategy() && self.patterns() == other.patterns()
    }
}

impl Eq for PathCondition {}

impl Hash for PathCondition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.strategy().hash(state);
        self.patterns().hash(state);
    }
}

impl fmt::Display for PathCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.patterns().join(" || "))
    }
}

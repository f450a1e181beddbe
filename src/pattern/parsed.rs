use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::segment::{decode_variables, has_template_syntax, SegmentMatcher};
use super::{concat_patterns, PathMatch, PatternError};
use crate::request::ParamVec;

#[derive(Debug, Clone)]
enum PatternSegment {
    Matcher(SegmentMatcher),
    /// Trailing `**` (no capture) or `{*name}` (captures the rest, with a
    /// leading `/`)
    CatchAll(Option<Arc<str>>),
}

/// A path pattern parsed once into segment matchers.
///
/// Supported syntax: literal segments, `?`, `*` within a segment, `{var}`,
/// `{var:regex}`, and a trailing `**` or `{*var}` catch-all. Patterns are
/// compared and hashed by their source text.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: Arc<str>,
    segments: Arc<[PatternSegment]>,
    captured_variables: usize,
    wildcards: usize,
    normalized_len: usize,
    catch_all: bool,
    first_dynamic: Option<usize>,
}

impl PathPattern {
    /// Parse a pattern. A missing leading `/` is added.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let source: Arc<str> = if pattern.is_empty() || pattern.starts_with('/') {
            Arc::from(pattern)
        } else {
            Arc::from(format!("/{pattern}"))
        };

        let raw: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut captured_variables = 0;
        let mut wildcards = 0;
        let mut normalized_len = 0;
        let mut catch_all = false;
        let mut first_dynamic = None;

        for (idx, segment) in raw.iter().enumerate() {
            normalized_len += 1; // separator
            let is_last = idx + 1 == raw.len();
            if first_dynamic.is_none() && has_template_syntax(segment) {
                first_dynamic = Some(idx);
            }

            let catch_all_name = if *segment == "**" {
                Some(None)
            } else if let Some(name) = segment.strip_prefix("{*").and_then(|s| s.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(PatternError::new(&source, "empty catch-all variable name"));
                }
                Some(Some(Arc::from(name)))
            } else {
                None
            };

            match catch_all_name {
                Some(name) => {
                    if !is_last {
                        return Err(PatternError::new(
                            &source,
                            "no more pattern data allowed after a '**' or '{*...}' element",
                        ));
                    }
                    if name.is_some() {
                        captured_variables += 1;
                    }
                    catch_all = true;
                    normalized_len += segment.len();
                    segments.push(PatternSegment::CatchAll(name));
                }
                None => {
                    if segment.contains("**") {
                        return Err(PatternError::new(
                            &source,
                            "'**' is only allowed as a whole trailing segment",
                        ));
                    }
                    let (matcher, stats) = SegmentMatcher::compile(segment, &source)?;
                    captured_variables += stats.variables;
                    wildcards += stats.wildcards;
                    normalized_len += stats.normalized_len;
                    segments.push(PatternSegment::Matcher(matcher));
                }
            }
        }
        if source.ends_with('/') && source.len() > 1 {
            normalized_len += 1;
        }

        Ok(Self {
            source,
            segments: segments.into(),
            captured_variables,
            wildcards,
            normalized_len,
            catch_all,
            first_dynamic,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern contains any template syntax.
    #[must_use]
    pub fn has_pattern_syntax(&self) -> bool {
        has_template_syntax(&self.source)
    }

    /// Ends with `**` or `{*var}`.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let mut vars = ParamVec::new();
        self.match_raw(path, &mut vars)
    }

    /// Match and extract decoded template variables.
    #[must_use]
    pub fn match_and_extract(&self, path: &str) -> Option<PathMatch> {
        let mut vars = ParamVec::new();
        if !self.match_raw(path, &mut vars) {
            return None;
        }
        let matched = match self.first_dynamic {
            Some(first) => path
                .split('/')
                .filter(|s| !s.is_empty())
                .skip(first)
                .collect::<Vec<_>>()
                .join("/"),
            None => String::new(),
        };
        Some(PathMatch {
            variables: decode_variables(vars),
            matched,
        })
    }

    fn match_raw(&self, path: &str, vars: &mut ParamVec) -> bool {
        if self.source.is_empty() {
            return path.is_empty();
        }
        if !path.starts_with('/') {
            return false;
        }
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                PatternSegment::CatchAll(name) => {
                    if let Some(name) = name {
                        let rest = parts[idx.min(parts.len())..].join("/");
                        vars.push((Arc::clone(name), format!("/{rest}")));
                    }
                    return true;
                }
                PatternSegment::Matcher(matcher) => {
                    let Some(part) = parts.get(idx) else {
                        return false;
                    };
                    if !matcher.matches(part, vars) {
                        return false;
                    }
                }
            }
        }
        parts.len() == self.segments.len() && self.source.ends_with('/') == path.ends_with('/')
    }

    /// Combine this (type-level) pattern with a method-level one.
    pub fn combine(&self, other: &PathPattern) -> Result<PathPattern, PatternError> {
        if self.source.is_empty() {
            return Ok(other.clone());
        }
        if other.source.is_empty() {
            return Ok(self.clone());
        }
        // /* + /hotel -> /hotel
        if self.captured_variables == 0 && self != other && self.matches(&other.source) {
            return Ok(other.clone());
        }
        if let Some(prefix) = self.source.strip_suffix("/*") {
            return PathPattern::parse(&concat_patterns(prefix, &other.source));
        }
        // /hotels/** + /bookings would leave ** in the middle
        if self.catch_all {
            return Err(PatternError::new(
                &format!("{} + {}", self.source, other.source),
                "cannot append to a catch-all pattern",
            ));
        }
        let Some(star_dot) = self.source.find("*.") else {
            return PathPattern::parse(&concat_patterns(&self.source, &other.source));
        };
        if self.captured_variables > 0 {
            return PathPattern::parse(&concat_patterns(&self.source, &other.source));
        }
        let ext1 = &self.source[star_dot + 1..];
        let (file2, ext2) = match other.source.rfind('.') {
            Some(dot) => (&other.source[..dot], &other.source[dot..]),
            None => (&other.source[..], ""),
        };
        let ext1_all = ext1 == ".*" || ext1.is_empty();
        let ext2_all = ext2 == ".*" || ext2.is_empty();
        if !ext1_all && !ext2_all {
            return Err(PatternError::new(
                &format!("{} + {}", self.source, other.source),
                "cannot combine two patterns with different file extensions",
            ));
        }
        PathPattern::parse(&format!("{file2}{}", if ext1_all { ext2 } else { ext1 }))
    }

    /// Static specificity ordering (`Less` = more specific).
    ///
    /// Catch-all patterns sort last (longer catch-alls first among them),
    /// then fewer captures and wildcards (a wildcard weighs 100 captures),
    /// then the longer normalized pattern.
    #[must_use]
    pub fn compare_specificity(&self, other: &PathPattern) -> Ordering {
        self.catch_all
            .cmp(&other.catch_all)
            .then_with(|| {
                if self.catch_all && other.catch_all {
                    other.normalized_len.cmp(&self.normalized_len)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| self.score().cmp(&other.score()))
            .then_with(|| other.normalized_len.cmp(&self.normalized_len))
    }

    fn score(&self) -> usize {
        self.captured_variables + self.wildcards * 100
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

impl Hash for PathPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

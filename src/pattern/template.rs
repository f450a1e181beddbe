use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::segment::{decode_variables, has_template_syntax, SegmentMatcher};
use super::{concat_patterns, PathMatch, PathMatcher, PatternError};
use crate::request::ParamVec;

#[derive(Debug)]
enum TemplateSegment {
    /// `**`: zero or more whole segments
    DoubleWildcard,
    Segment(SegmentMatcher),
}

#[derive(Debug)]
struct CompiledTemplate {
    absolute: bool,
    trailing_slash: bool,
    ends_with_double_wildcard: bool,
    /// Index of the first segment with template syntax
    first_dynamic: Option<usize>,
    segments: Vec<TemplateSegment>,
}

impl CompiledTemplate {
    fn compile(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut first_dynamic = None;
        for (idx, raw) in pattern.split('/').filter(|s| !s.is_empty()).enumerate() {
            if raw == "**" {
                // adjacent `**` span the same segments as one
                if !matches!(segments.last(), Some(TemplateSegment::DoubleWildcard)) {
                    segments.push(TemplateSegment::DoubleWildcard);
                }
            } else {
                let (matcher, _) = SegmentMatcher::compile(raw, pattern)?;
                segments.push(TemplateSegment::Segment(matcher));
            }
            if first_dynamic.is_none() && has_template_syntax(raw) {
                first_dynamic = Some(idx);
            }
        }
        Ok(Self {
            absolute: pattern.starts_with('/'),
            trailing_slash: pattern.ends_with('/'),
            ends_with_double_wildcard: matches!(segments.last(), Some(TemplateSegment::DoubleWildcard)),
            first_dynamic,
            segments,
        })
    }

    fn match_path(&self, path: &str, vars: &mut ParamVec) -> bool {
        if self.absolute != path.starts_with('/') {
            return false;
        }
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if !match_segments(&self.segments, &parts, vars) {
            return false;
        }
        self.ends_with_double_wildcard || self.trailing_slash == path.ends_with('/')
    }

    fn path_within_pattern(&self, path: &str) -> String {
        let Some(first) = self.first_dynamic else {
            return String::new();
        };
        path.split('/')
            .filter(|s| !s.is_empty())
            .skip(first)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Backtracking segment matcher; `**` tries every possible span.
///
/// Failed `(segment, part)` states are remembered, so each state is
/// explored at most once.
fn match_segments(segments: &[TemplateSegment], parts: &[&str], vars: &mut ParamVec) -> bool {
    let mut failed = vec![false; (segments.len() + 1) * (parts.len() + 1)];
    match_from(segments, parts, 0, 0, vars, &mut failed)
}

fn match_from(
    segments: &[TemplateSegment],
    parts: &[&str],
    segment: usize,
    part: usize,
    vars: &mut ParamVec,
    failed: &mut [bool],
) -> bool {
    let state = segment * (parts.len() + 1) + part;
    if failed[state] {
        return false;
    }
    let mark = vars.len();
    let matched = match segments.get(segment) {
        None => part == parts.len(),
        Some(TemplateSegment::DoubleWildcard) => {
            (part..=parts.len()).any(|next| match_from(segments, parts, segment + 1, next, vars, failed))
        }
        Some(TemplateSegment::Segment(matcher)) => parts.get(part).is_some_and(|first| {
            matcher.matches(first, vars) && match_from(segments, parts, segment + 1, part + 1, vars, failed)
        }),
    };
    if !matched {
        vars.truncate(mark);
        failed[state] = true;
    }
    matched
}

/// Default [`PathMatcher`]: ant-style string templates with a compiled cache.
///
/// Compiled templates are cached per pattern string; the cache is filled
/// lazily and shared by all threads.
#[derive(Debug, Default)]
pub struct TemplatePathMatcher {
    cache: DashMap<String, Arc<CompiledTemplate>>,
}

impl TemplatePathMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, pattern: &str) -> Result<Arc<CompiledTemplate>, PatternError> {
        if let Some(hit) = self.cache.get(pattern) {
            return Ok(Arc::clone(hit.value()));
        }
        let compiled = Arc::new(CompiledTemplate::compile(pattern)?);
        self.cache
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&compiled));
        Ok(compiled)
    }

    fn match_raw(&self, pattern: &str, path: &str) -> Option<(Arc<CompiledTemplate>, ParamVec)> {
        let compiled = match self.compiled(pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                debug!(error = %e, "Template failed to compile, treating as no match");
                return None;
            }
        };
        let mut vars = ParamVec::new();
        compiled.match_path(path, &mut vars).then_some((compiled, vars))
    }
}

impl PathMatcher for TemplatePathMatcher {
    fn validate(&self, pattern: &str) -> Result<(), PatternError> {
        self.compiled(pattern).map(|_| ())
    }

    fn matches(&self, pattern: &str, path: &str) -> bool {
        self.match_raw(pattern, path).is_some()
    }

    fn match_and_extract(&self, pattern: &str, path: &str) -> Option<PathMatch> {
        let (compiled, vars) = self.match_raw(pattern, path)?;
        Some(PathMatch {
            variables: decode_variables(vars),
            matched: compiled.path_within_pattern(path),
        })
    }

    /// Combine two templates:
    ///
    /// - `/hotels` + `/bookings` → `/hotels/bookings`
    /// - `/hotels/*` + `/bookings` → `/hotels/bookings`
    /// - `/hotels/**` + `/bookings` → `/hotels/**/bookings`
    /// - `/*.html` + `/hotels` → `/hotels.html`
    /// - `/*.html` + `/*.txt` → error
    fn combine(&self, first: &str, second: &str) -> Result<String, PatternError> {
        if first.is_empty() {
            return Ok(second.to_string());
        }
        if second.is_empty() {
            return Ok(first.to_string());
        }

        let first_has_vars = first.contains('{');
        if first != second && !first_has_vars && self.matches(first, second) {
            // /* + /hotel -> /hotel ; "/*.*" + "/*.html" -> /*.html
            return Ok(second.to_string());
        }

        if let Some(prefix) = first.strip_suffix("/*") {
            return Ok(concat_patterns(prefix, second));
        }
        if first.ends_with("/**") {
            return Ok(concat_patterns(first, second));
        }

        let star_dot = first.find("*.");
        let (Some(star_dot), false) = (star_dot, first_has_vars) else {
            return Ok(concat_patterns(first, second));
        };
        // /*.html + /hotels -> /hotels.html
        let ext1 = &first[star_dot + 1..];
        let (file2, ext2) = match second.rfind('.') {
            Some(dot) => (&second[..dot], &second[dot..]),
            None => (second, ""),
        };
        let ext1_all = ext1 == ".*" || ext1.is_empty();
        let ext2_all = ext2 == ".*" || ext2.is_empty();
        if !ext1_all && !ext2_all {
            return Err(PatternError::new(
                &format!("{first} + {second}"),
                "cannot combine two patterns with different file extensions",
            ));
        }
        let ext = if ext1_all { ext2 } else { ext1 };
        Ok(format!("{file2}{ext}"))
    }

    fn compare_specificity(&self, first: &str, second: &str, path: &str) -> Ordering {
        let info1 = TemplateInfo::new(first);
        let info2 = TemplateInfo::new(second);

        match (info1.least_specific, info2.least_specific) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }

        match (first == path, second == path) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        if info1.prefix && info2.prefix {
            return info2.length.cmp(&info1.length);
        } else if info1.prefix && info2.double_wildcards == 0 {
            return Ordering::Greater;
        } else if info2.prefix && info1.double_wildcards == 0 {
            return Ordering::Less;
        }

        info1
            .total()
            .cmp(&info2.total())
            .then_with(|| info2.length.cmp(&info1.length))
            .then_with(|| info1.single_wildcards.cmp(&info2.single_wildcards))
            .then_with(|| info1.uri_vars.cmp(&info2.uri_vars))
    }
}

/// Syntax counts of one template, used for specificity ordering.
#[derive(Debug, Default)]
struct TemplateInfo {
    uri_vars: usize,
    single_wildcards: usize,
    double_wildcards: usize,
    least_specific: bool,
    prefix: bool,
    /// Length with every `{...}` counted as a single character
    length: usize,
}

impl TemplateInfo {
    fn new(pattern: &str) -> Self {
        let mut info = TemplateInfo {
            least_specific: pattern == "/**",
            prefix: pattern != "/**" && pattern.ends_with("/**"),
            ..Default::default()
        };
        let bytes = pattern.as_bytes();
        let mut depth = 0usize;
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b'{' => {
                    if depth == 0 {
                        info.uri_vars += 1;
                        info.length += 1;
                    }
                    depth += 1;
                }
                b'}' => depth = depth.saturating_sub(1),
                _ if depth > 0 => {}
                b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                    info.double_wildcards += 1;
                    info.length += 2;
                    pos += 1;
                }
                b'*' => {
                    if pos == 0 || bytes[pos - 1] != b'.' || pos + 1 != bytes.len() {
                        info.single_wildcards += 1;
                    }
                    info.length += 1;
                }
                _ => info.length += 1,
            }
            pos += 1;
        }
        info
    }

    fn total(&self) -> usize {
        self.uri_vars + self.single_wildcards + 2 * self.double_wildcards
    }
}

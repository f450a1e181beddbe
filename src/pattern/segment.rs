use regex::Regex;
use std::sync::Arc;

use super::PatternError;
use crate::request::ParamVec;

/// Matcher for a single `/`-delimited segment of a path template.
///
/// Literal segments compare by string equality; a segment that is exactly
/// `{name}` captures the whole (non-empty) segment; anything else with
/// template syntax (`*`, `?`, `{name:regex}`, `{a}-{b}`) compiles to an
/// anchored regex.
#[derive(Debug, Clone)]
pub(crate) enum SegmentMatcher {
    Literal(Arc<str>),
    Capture(Arc<str>),
    Regex {
        regex: Regex,
        names: Vec<Arc<str>>,
    },
}

/// Syntax counts used by the specificity comparators.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SegmentStats {
    pub variables: usize,
    pub wildcards: usize,
    /// Segment length with each `{...}` counted as one character
    pub normalized_len: usize,
}

impl SegmentMatcher {
    pub(crate) fn compile(segment: &str, pattern: &str) -> Result<(Self, SegmentStats), PatternError> {
        let mut stats = SegmentStats::default();
        if !has_template_syntax(segment) {
            stats.normalized_len = segment.chars().count();
            return Ok((SegmentMatcher::Literal(Arc::from(segment)), stats));
        }

        let mut regex_src = String::with_capacity(segment.len() + 8);
        regex_src.push('^');
        let mut names: Vec<Arc<str>> = Vec::new();
        let mut literal = String::new();
        let mut chars = segment.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '{' => {
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    let body = read_braced(segment, idx)
                        .ok_or_else(|| PatternError::new(pattern, "unbalanced '{' in template"))?;
                    // skip the consumed body and closing brace
                    for _ in 0..body.chars().count() + 1 {
                        chars.next();
                    }
                    let (name, custom) = match body.split_once(':') {
                        Some((name, regex)) => (name.trim(), Some(regex)),
                        None => (body.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(PatternError::new(pattern, "empty variable name"));
                    }
                    if names.iter().any(|n| n.as_ref() == name) {
                        return Err(PatternError::new(
                            pattern,
                            "variable name used more than once in a segment",
                        ));
                    }
                    regex_src.push_str(&format!("(?P<v{}>", names.len()));
                    regex_src.push_str(custom.unwrap_or(".+"));
                    regex_src.push(')');
                    names.push(Arc::from(name));
                    stats.variables += 1;
                    stats.normalized_len += 1;
                }
                '}' => return Err(PatternError::new(pattern, "unbalanced '}' in template")),
                '*' => {
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_src.push_str(".*");
                    stats.wildcards += 1;
                    stats.normalized_len += 1;
                }
                '?' => {
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_src.push('.');
                    stats.normalized_len += 1;
                }
                c => {
                    literal.push(c);
                    stats.normalized_len += 1;
                }
            }
        }
        regex_src.push_str(&regex::escape(&literal));
        regex_src.push('$');

        if names.len() == 1 && segment.starts_with('{') && segment.ends_with('}') {
            let whole = &segment[1..segment.len() - 1];
            if !whole.contains(':') && !whole.contains('{') {
                return Ok((SegmentMatcher::Capture(Arc::clone(&names[0])), stats));
            }
        }

        let regex = Regex::new(&regex_src)
            .map_err(|e| PatternError::new(pattern, &format!("invalid regex: {e}")))?;
        Ok((SegmentMatcher::Regex { regex, names }, stats))
    }

    /// Match one path segment, pushing raw (undecoded) captures into `vars`.
    pub(crate) fn matches(&self, segment: &str, vars: &mut ParamVec) -> bool {
        match self {
            SegmentMatcher::Literal(lit) => lit.as_ref() == segment,
            SegmentMatcher::Capture(name) => {
                if segment.is_empty() {
                    return false;
                }
                vars.push((Arc::clone(name), segment.to_string()));
                true
            }
            SegmentMatcher::Regex { regex, names } => {
                let Some(caps) = regex.captures(segment) else {
                    return false;
                };
                for (idx, name) in names.iter().enumerate() {
                    let value = caps
                        .name(&format!("v{idx}"))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    vars.push((Arc::clone(name), value.to_string()));
                }
                true
            }
        }
    }
}

/// Whether a pattern string uses any template syntax.
pub(crate) fn has_template_syntax(pattern: &str) -> bool {
    pattern.contains(['{', '*', '?'])
}

/// Body between the `{` at `open` and its matching `}` (nested braces allowed
/// inside custom regexes such as `{id:\d{3}}`).
fn read_braced(segment: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    for (idx, c) in segment[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&segment[open + 1..open + idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Percent-decode captured variables; undecodable values are kept raw.
pub(crate) fn decode_variables(vars: ParamVec) -> ParamVec {
    vars.into_iter()
        .map(|(name, value)| {
            let decoded = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            (name, decoded)
        })
        .collect()
}

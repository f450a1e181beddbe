use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Error returned when a media type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMediaType {
    /// The offending input
    pub input: String,
    /// Why parsing failed
    pub reason: &'static str,
}

impl fmt::Display for InvalidMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid media type \"{}\": {}", self.input, self.reason)
    }
}

impl std::error::Error for InvalidMediaType {}

const WILDCARD: &str = "*";

/// A parsed `type/subtype;param=value` media type.
///
/// Type, subtype and parameter names are stored lowercase; parameter values
/// keep their case (but compare case-insensitively where the matching rules
/// say so). Parameters live in a `BTreeMap` so that equality and hashing are
/// independent of declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: String,
    subtype: String,
    params: BTreeMap<String, String>,
}

impl MediaType {
    /// Create a media type without parameters.
    #[must_use]
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: BTreeMap::new(),
        }
    }

    /// `*/*`
    #[must_use]
    pub fn all() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// `application/json`
    #[must_use]
    pub fn application_json() -> Self {
        Self::new("application", "json")
    }

    /// `application/xml`
    #[must_use]
    pub fn application_xml() -> Self {
        Self::new("application", "xml")
    }

    /// `application/*+json`
    #[must_use]
    pub fn application_any_json() -> Self {
        Self::new("application", "*+json")
    }

    /// `application/octet-stream`
    #[must_use]
    pub fn application_octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// `application/x-www-form-urlencoded`
    #[must_use]
    pub fn application_form_urlencoded() -> Self {
        Self::new("application", "x-www-form-urlencoded")
    }

    /// `text/plain`
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// `text/event-stream`
    #[must_use]
    pub fn text_event_stream() -> Self {
        Self::new("text", "event-stream")
    }

    /// Parse a single media type. A lone `*` is accepted as `*/*`.
    pub fn parse(input: &str) -> Result<Self, InvalidMediaType> {
        let invalid = |reason| InvalidMediaType {
            input: input.to_string(),
            reason,
        };
        let mut parts = split_outside_quotes(input, ';').into_iter();
        let full = parts.next().unwrap_or_default();
        let full = full.trim();
        if full.is_empty() {
            return Err(invalid("'mimeType' must not be empty"));
        }
        let full = if full == WILDCARD { "*/*" } else { full };
        let (kind, subtype) = full
            .split_once('/')
            .ok_or_else(|| invalid("does not contain '/'"))?;
        if kind.is_empty() {
            return Err(invalid("'type' must not be empty"));
        }
        if subtype.is_empty() {
            return Err(invalid("'subtype' must not be empty"));
        }
        if subtype.contains('/') {
            return Err(invalid("contains more than one '/'"));
        }
        if kind == WILDCARD && subtype != WILDCARD {
            return Err(invalid("wildcard type is legal only in '*/*' (all mime types)"));
        }
        if !is_token(kind) || !is_token(subtype) {
            return Err(invalid("contains an illegal character"));
        }

        let mut media = Self::new(kind, subtype);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| invalid("parameter without '='"))?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || !is_token(name) {
                return Err(invalid("illegal parameter name"));
            }
            if name.eq_ignore_ascii_case("q") {
                let q = unquote(value)
                    .parse::<f64>()
                    .map_err(|_| invalid("quality value is not a number"))?;
                if !(0.0..=1.0).contains(&q) {
                    return Err(invalid("quality value must be between 0.0 and 1.0"));
                }
            }
            media
                .params
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
        Ok(media)
    }

    /// Parse a comma-separated list, as found in `Accept` headers.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, InvalidMediaType> {
        split_outside_quotes(input, ',')
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Self::parse(&s))
            .collect()
    }

    /// Primary type (`application` in `application/json`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Suffix after the last `+` of the subtype (`json` in `vnd.api+json`).
    #[must_use]
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.subtype
            .rfind('+')
            .map(|idx| &self.subtype[idx + 1..])
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parameters in name order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return a copy with one parameter set.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.params
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.kind == WILDCARD
    }

    /// True for `*` and `*+suffix` subtypes.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    /// True when neither type nor subtype is a wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// The `q` parameter, `1.0` when absent or unparsable.
    #[must_use]
    pub fn quality(&self) -> f64 {
        self.parameter("q")
            .and_then(|q| unquote(q).parse::<f64>().ok())
            .unwrap_or(1.0)
    }

    /// Copy without the `q` parameter.
    #[must_use]
    pub fn remove_quality(&self) -> Self {
        let mut copy = self.clone();
        copy.params.remove("q");
        copy
    }

    /// Copy carrying the quality value of `other` (if it has one).
    #[must_use]
    pub fn copy_quality_from(&self, other: &MediaType) -> Self {
        let mut copy = self.clone();
        match other.params.get("q") {
            Some(q) => {
                copy.params.insert("q".to_string(), q.clone());
            }
            None => {
                copy.params.remove("q");
            }
        }
        copy
    }

    /// Type and subtype equal, parameters ignored.
    #[must_use]
    pub fn equals_type_and_subtype(&self, other: &MediaType) -> bool {
        self.kind == other.kind && self.subtype == other.subtype
    }

    /// Whether this media type includes `other`.
    ///
    /// `text/*` includes `text/plain`; `application/*+xml` includes
    /// `application/soap+xml`. Not symmetric.
    #[must_use]
    pub fn includes(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        if self.kind != other.kind {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if self.is_wildcard_subtype() {
            let Some(plus) = self.subtype.rfind('+') else {
                return true;
            };
            // *+xml includes soap+xml
            if let Some(other_plus) = other.subtype.rfind('+') {
                let this_no_suffix = &self.subtype[..plus];
                let this_suffix = &self.subtype[plus + 1..];
                let other_suffix = &other.subtype[other_plus + 1..];
                if this_suffix == other_suffix && this_no_suffix == WILDCARD {
                    return true;
                }
            }
        }
        false
    }

    /// Symmetric compatibility check used by content negotiation.
    #[must_use]
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.kind != other.kind {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if self.is_wildcard_subtype() || other.is_wildcard_subtype() {
            if self.subtype == WILDCARD || other.subtype == WILDCARD {
                return true;
            }
            let this_suffix = self.subtype_suffix();
            let other_suffix = other.subtype_suffix();
            if self.is_wildcard_subtype() {
                if let Some(suffix) = this_suffix {
                    return suffix == other.subtype || Some(suffix) == other_suffix;
                }
            } else if let Some(suffix) = other_suffix {
                return self.subtype == suffix || Some(suffix) == this_suffix;
            }
        }
        false
    }

    /// Whether an equal type/subtype is present in `types`.
    #[must_use]
    pub fn is_present_in(&self, types: &[MediaType]) -> bool {
        types.iter().any(|t| t.equals_type_and_subtype(self))
    }

    /// Specificity order (`Less` = `self` is more specific).
    ///
    /// Wildcards sort after concrete types; within the same type and
    /// subtype, higher quality wins and then more parameters win. Types that
    /// are unrelated compare `Equal`, so this is not a total order; use
    /// [`sort_by_specificity_and_quality`] rather than `slice::sort_by`.
    #[must_use]
    pub fn compare_specificity(&self, other: &MediaType) -> Ordering {
        if self.is_wildcard_type() && !other.is_wildcard_type() {
            return Ordering::Greater;
        }
        if other.is_wildcard_type() && !self.is_wildcard_type() {
            return Ordering::Less;
        }
        if self.kind != other.kind {
            return Ordering::Equal;
        }
        if self.is_wildcard_subtype() && !other.is_wildcard_subtype() {
            return Ordering::Greater;
        }
        if other.is_wildcard_subtype() && !self.is_wildcard_subtype() {
            return Ordering::Less;
        }
        if self.subtype != other.subtype {
            return Ordering::Equal;
        }
        self.compare_parameters(other)
    }

    /// Quality order (`Less` = `self` preferred): higher `q` first, then
    /// the same wildcard/parameter tie-breakers as specificity.
    #[must_use]
    pub fn compare_quality(&self, other: &MediaType) -> Ordering {
        match other.quality().partial_cmp(&self.quality()) {
            Some(Ordering::Equal) | None => {}
            Some(ordering) => return ordering,
        }
        if self.is_wildcard_type() && !other.is_wildcard_type() {
            return Ordering::Greater;
        }
        if other.is_wildcard_type() && !self.is_wildcard_type() {
            return Ordering::Less;
        }
        if self.kind != other.kind {
            return Ordering::Equal;
        }
        if self.is_wildcard_subtype() && !other.is_wildcard_subtype() {
            return Ordering::Greater;
        }
        if other.is_wildcard_subtype() && !self.is_wildcard_subtype() {
            return Ordering::Less;
        }
        if self.subtype != other.subtype {
            return Ordering::Equal;
        }
        other.params.len().cmp(&self.params.len())
    }

    fn compare_parameters(&self, other: &MediaType) -> Ordering {
        match other.quality().partial_cmp(&self.quality()) {
            Some(Ordering::Equal) | None => other.params.len().cmp(&self.params.len()),
            Some(ordering) => ordering,
        }
    }

    /// Whether each parameter declared on `self` agrees with `other`
    /// (case-insensitive); parameters absent on either side are ignored.
    #[must_use]
    pub fn parameters_agree_with(&self, other: &MediaType) -> bool {
        self.params
            .iter()
            .filter(|(name, _)| name.as_str() != "q")
            .all(|(name, value)| match other.params.get(name) {
                Some(theirs) if !value.is_empty() && !theirs.is_empty() => {
                    unquote(value).eq_ignore_ascii_case(unquote(theirs))
                }
                _ => true,
            })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = InvalidMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Sort by specificity, breaking ties by quality.
///
/// The specificity relation is only a partial order (unrelated types compare
/// equal), which `slice::sort_by` does not accept, so this is a stable
/// insertion sort: an element moves ahead only past elements it is strictly
/// preferred to.
pub fn sort_by_specificity_and_quality(types: &mut [MediaType]) {
    let preferred = |a: &MediaType, b: &MediaType| {
        a.compare_specificity(b)
            .then_with(|| a.compare_quality(b))
            == Ordering::Less
    };
    for i in 1..types.len() {
        let mut j = i;
        while j > 0 && preferred(&types[j], &types[j - 1]) {
            types.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// The more specific of an acceptable type and a producible type, carrying
/// the acceptable type's quality.
#[must_use]
pub fn most_specific_media_type(accept: &MediaType, produce: &MediaType) -> MediaType {
    let produce = produce.copy_quality_from(accept);
    if accept.compare_specificity(&produce) != Ordering::Greater {
        accept.clone()
    } else {
        produce
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^'
                        | b'_' | b'`' | b'|' | b'~'
                )
        })
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

fn split_outside_quotes(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' if quoted => {
                escaped = true;
                current.push(c);
            }
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c == delimiter && !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

use http::Method;
use std::cmp::Ordering;
use std::fmt;

use super::RequestCondition;
use crate::request::HttpRequest;

/// Canonical rendering order for method sets (`Allow` headers, `Display`).
const CANONICAL_ORDER: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Sort and deduplicate methods in canonical order; extension methods go
/// last, alphabetically.
pub(crate) fn sort_methods(methods: &mut Vec<Method>) {
    let rank = |m: &Method| {
        CANONICAL_ORDER
            .iter()
            .position(|c| c == m)
            .unwrap_or(CANONICAL_ORDER.len())
    };
    methods.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.as_str().cmp(b.as_str())));
    methods.dedup();
}

/// HTTP method condition. Empty means "any method except OPTIONS".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestMethodsCondition {
    methods: Vec<Method>,
}

impl RequestMethodsCondition {
    #[must_use]
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut methods: Vec<Method> = methods.into_iter().collect();
        sort_methods(&mut methods);
        Self { methods }
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    fn single(method: Method) -> Self {
        Self {
            methods: vec![method],
        }
    }
}

impl RequestCondition for RequestMethodsCondition {
    fn combine(&self, other: &Self) -> Self {
        Self::new(self.methods.iter().chain(&other.methods).cloned())
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Self> {
        let method = request.method();
        if self.methods.is_empty() {
            return (method != Method::OPTIONS).then(|| self.clone());
        }
        if self.methods.contains(method) {
            return Some(Self::single(method.clone()));
        }
        if method == Method::HEAD && self.methods.contains(&Method::GET) {
            return Some(Self::single(Method::GET));
        }
        None
    }

    /// More methods first; among single-method conditions, an explicit HEAD
    /// mapping beats a GET mapping that also serves HEAD.
    fn compare_to(&self, other: &Self, _request: &HttpRequest) -> Ordering {
        if self.methods.len() != other.methods.len() {
            return other.methods.len().cmp(&self.methods.len());
        }
        if self.methods.len() == 1 {
            if self.methods[0] == Method::HEAD && other.methods[0] == Method::GET {
                return Ordering::Less;
            }
            if self.methods[0] == Method::GET && other.methods[0] == Method::HEAD {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }

    fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Display for RequestMethodsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        write!(f, "[{}]", rendered.join(" || "))
    }
}

use http::Method;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::builder::{MappingDescriptorBuilder, MappingOptions};
use crate::condition::{
    ConsumesCondition, CustomConditionHolder, HeadersCondition, ParamsCondition, PathCondition,
    PathStrategy, ProducesCondition, RequestCondition, RequestMethodsCondition,
};
use crate::error::DescriptorError;
use crate::request::HttpRequest;

/// The full matching contract of one handler: path, methods, params,
/// headers, consumes, produces and an optional custom condition.
///
/// Built with [`MappingDescriptorBuilder`]; immutable afterwards.
/// [`MappingDescriptor::mutate`] returns a builder seeded with this
/// descriptor's state. Equality and hashing cover the conditions, not the
/// name.
#[derive(Debug, Clone)]
pub struct MappingDescriptor {
    pub(super) name: Option<String>,
    pub(super) path: PathCondition,
    pub(super) methods: RequestMethodsCondition,
    pub(super) params: ParamsCondition,
    pub(super) headers: HeadersCondition,
    pub(super) consumes: ConsumesCondition,
    pub(super) produces: ProducesCondition,
    pub(super) custom: CustomConditionHolder,
    pub(super) options: MappingOptions,
}

impl MappingDescriptor {
    /// Start a descriptor for the given path patterns with default options.
    #[must_use]
    pub fn paths<S: AsRef<str>>(paths: &[S]) -> MappingDescriptorBuilder {
        MappingDescriptorBuilder::new().paths(paths)
    }

    #[must_use]
    pub fn builder() -> MappingDescriptorBuilder {
        MappingDescriptorBuilder::new()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn path_condition(&self) -> &PathCondition {
        &self.path
    }

    #[must_use]
    pub fn methods_condition(&self) -> &RequestMethodsCondition {
        &self.methods
    }

    #[must_use]
    pub fn params_condition(&self) -> &ParamsCondition {
        &self.params
    }

    #[must_use]
    pub fn headers_condition(&self) -> &HeadersCondition {
        &self.headers
    }

    #[must_use]
    pub fn consumes_condition(&self) -> &ConsumesCondition {
        &self.consumes
    }

    #[must_use]
    pub fn produces_condition(&self) -> &ProducesCondition {
        &self.produces
    }

    #[must_use]
    pub fn custom_condition(&self) -> &CustomConditionHolder {
        &self.custom
    }

    #[must_use]
    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    #[must_use]
    pub fn strategy(&self) -> PathStrategy {
        self.path.strategy()
    }

    /// Pattern strings of the path condition.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.path.patterns()
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        self.methods.methods()
    }

    /// A builder seeded with this descriptor; the descriptor itself is left
    /// untouched.
    #[must_use]
    pub fn mutate(&self) -> MappingDescriptorBuilder {
        MappingDescriptorBuilder::seeded(self)
    }

    /// Combine a type-level descriptor (`self`) with a method-level one.
    ///
    /// Methods, params and headers are unioned, paths are concatenated
    /// pairwise, consumes and produces of `other` replace ours when
    /// non-empty, names are joined with `#`.
    pub fn combine(&self, other: &MappingDescriptor) -> Result<MappingDescriptor, DescriptorError> {
        let name = match (&self.name, &other.name) {
            (Some(mine), Some(theirs)) => Some(format!("{mine}#{theirs}")),
            (mine, theirs) => mine.clone().or_else(|| theirs.clone()),
        };
        Ok(MappingDescriptor {
            name,
            path: self.path.combine(&other.path)?,
            methods: self.methods.combine(&other.methods),
            params: self.params.combine(&other.params),
            headers: self.headers.combine(&other.headers),
            consumes: self.consumes.combine(&other.consumes),
            produces: self.produces.combine(&other.produces),
            custom: self.custom.combine(&other.custom),
            options: self.options.clone(),
        })
    }

    /// Narrow every condition to what matched `request`, or `None` as soon
    /// as one condition fails.
    ///
    /// Order: methods, params, headers, consumes, produces, path, custom.
    #[must_use]
    pub fn matching_condition(&self, request: &HttpRequest) -> Option<MappingDescriptor> {
        let methods = self.methods.matching_condition(request)?;
        let params = self.params.matching_condition(request)?;
        let headers = self.headers.matching_condition(request)?;
        let consumes = self.consumes.matching_condition(request)?;
        let produces = self.produces.matching_condition(request)?;
        let path = self.path.matching_condition(request.path())?;
        let custom = self.custom.matching_condition(request)?;
        Some(MappingDescriptor {
            name: self.name.clone(),
            path,
            methods,
            params,
            headers,
            consumes,
            produces,
            custom,
            options: self.options.clone(),
        })
    }

    /// Compare two descriptors that both matched `request`.
    ///
    /// `Less` means `self` is the better match. Fields are consulted in
    /// matching order: methods, params, headers, consumes, produces, path,
    /// then custom. `Equal` means the two cannot be told apart.
    #[must_use]
    pub fn compare_to(&self, other: &MappingDescriptor, request: &HttpRequest) -> Ordering {
        self.methods
            .compare_to(&other.methods, request)
            .then_with(|| self.params.compare_to(&other.params, request))
            .then_with(|| self.headers.compare_to(&other.headers, request))
            .then_with(|| self.consumes.compare_to(&other.consumes, request))
            .then_with(|| self.produces.compare_to(&other.produces, request))
            .then_with(|| self.path.compare_to(&other.path, request.path()))
            .then_with(|| self.custom.compare_to(&other.custom, request))
    }
}

impl PartialEq for MappingDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.methods == other.methods
            && self.params == other.params
            && self.headers == other.headers
            && self.consumes == other.consumes
            && self.produces == other.produces
            && self.custom == other.custom
    }
}

impl Eq for MappingDescriptor {}

impl Hash for MappingDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.methods.hash(state);
        self.params.hash(state);
        self.headers.hash(state);
        self.consumes.hash(state);
        self.produces.hash(state);
        self.custom.hash(state);
    }
}

impl fmt::Display for MappingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        match self.methods.methods() {
            [] => {}
            [single] => write!(f, "{single} ")?,
            _ => write!(f, "{} ", self.methods)?,
        }
        write!(f, "{}", self.path)?;
        if !self.params.is_empty() {
            write!(f, ", params {}", self.params)?;
        }
        if !self.headers.is_empty() {
            write!(f, ", headers {}", self.headers)?;
        }
        if !self.consumes.is_empty() {
            write!(f, ", consumes {}", self.consumes)?;
        }
        if !self.produces.is_empty() {
            write!(f, ", produces {}", self.produces)?;
        }
        if !self.custom.is_empty() {
            write!(f, ", and {}", self.custom)?;
        }
        f.write_str("}")
    }
}

use http::Method;
use std::fmt;
use std::sync::Arc;

use super::descriptor::MappingDescriptor;
use crate::condition::{
    is_media_type_header, ConsumesCondition, CustomCondition, CustomConditionHolder,
    HeadersCondition, MediaTypeExpression, NameValueExpression, ParamsCondition, PathCondition,
    PathStrategy, ProducesCondition, RequestMethodsCondition,
};
use crate::config::DispatchConfig;
use crate::error::DescriptorError;
use crate::media::{ContentNegotiator, HeaderContentNegotiator, MediaType};
use crate::pattern::{PathMatcher, TemplatePathMatcher};

/// Shared collaborators and switches applied to every descriptor a builder
/// produces. A registry hands its options to the descriptors it creates so
/// that all of them use one strategy, one matcher and one negotiator.
#[derive(Clone)]
pub struct MappingOptions {
    pub path_strategy: PathStrategy,
    /// Used by the template strategy
    pub path_matcher: Arc<dyn PathMatcher>,
    pub negotiator: Arc<dyn ContentNegotiator>,
    /// Also match `/items/` for a `/items` pattern
    pub trailing_slash_match: bool,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            path_strategy: PathStrategy::Parsed,
            path_matcher: Arc::new(TemplatePathMatcher::new()),
            negotiator: Arc::new(HeaderContentNegotiator),
            trailing_slash_match: false,
        }
    }
}

impl MappingOptions {
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            path_strategy: config.path_strategy,
            trailing_slash_match: config.trailing_slash_match,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn template() -> Self {
        Self {
            path_strategy: PathStrategy::Template,
            ..Self::default()
        }
    }
}

impl fmt::Debug for MappingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingOptions")
            .field("path_strategy", &self.path_strategy)
            .field("trailing_slash_match", &self.trailing_slash_match)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MappingDescriptor`].
///
/// Expressions are kept as strings until [`build`](Self::build), which
/// parses and validates everything and reports the first problem as a
/// [`DescriptorError`].
#[derive(Debug, Clone, Default)]
pub struct MappingDescriptorBuilder {
    paths: Vec<String>,
    methods: Vec<Method>,
    params: Vec<String>,
    headers: Vec<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
    body_required: Option<bool>,
    custom: Option<Arc<dyn CustomCondition>>,
    name: Option<String>,
    options: MappingOptions,
}

fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}

impl MappingDescriptorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn seeded(descriptor: &MappingDescriptor) -> Self {
        Self {
            paths: owned(&descriptor.path.patterns()),
            methods: descriptor.methods.methods().to_vec(),
            params: descriptor.params.expressions().map(ToString::to_string).collect(),
            headers: descriptor.headers.expressions().map(ToString::to_string).collect(),
            consumes: descriptor.consumes.expressions().iter().map(ToString::to_string).collect(),
            produces: descriptor.produces.expressions().iter().map(ToString::to_string).collect(),
            body_required: Some(descriptor.consumes.is_body_required()),
            custom: descriptor.custom.condition().cloned(),
            name: descriptor.name.clone(),
            options: descriptor.options.clone(),
        }
    }

    #[must_use]
    pub fn paths<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.paths = owned(paths);
        self
    }

    #[must_use]
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    /// `name`, `!name`, `name=value`, `name!=value`.
    #[must_use]
    pub fn params<S: AsRef<str>>(mut self, params: &[S]) -> Self {
        self.params = owned(params);
        self
    }

    /// Same syntax as params; `Accept=...` and `Content-Type=...` become
    /// produces and consumes expressions.
    #[must_use]
    pub fn headers<S: AsRef<str>>(mut self, headers: &[S]) -> Self {
        self.headers = owned(headers);
        self
    }

    /// `type/subtype` or `!type/subtype`.
    #[must_use]
    pub fn consumes<S: AsRef<str>>(mut self, consumes: &[S]) -> Self {
        self.consumes = owned(consumes);
        self
    }

    #[must_use]
    pub fn produces<S: AsRef<str>>(mut self, produces: &[S]) -> Self {
        self.produces = owned(produces);
        self
    }

    /// Whether body-less requests must still satisfy consumes (default
    /// `true`).
    #[must_use]
    pub fn body_required(mut self, required: bool) -> Self {
        self.body_required = Some(required);
        self
    }

    #[must_use]
    pub fn custom(mut self, condition: Arc<dyn CustomCondition>) -> Self {
        self.custom = Some(condition);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: MappingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<MappingDescriptor, DescriptorError> {
        let options = self.options;
        let path = match options.path_strategy {
            PathStrategy::Parsed => PathCondition::parsed(&self.paths, options.trailing_slash_match)?,
            PathStrategy::Template => PathCondition::template(
                &self.paths,
                Arc::clone(&options.path_matcher),
                options.trailing_slash_match,
            )?,
        };

        let mut consumes = parse_media_expressions(&self.consumes)?;
        let mut produces = parse_media_expressions(&self.produces)?;
        for raw in &self.headers {
            let expression = NameValueExpression::parse(raw, true)?;
            if !is_media_type_header(expression.name()) {
                continue;
            }
            let Some(value) = expression.value() else {
                continue;
            };
            let target = if expression.name() == "accept" {
                &mut produces
            } else {
                &mut consumes
            };
            for media_type in MediaType::parse_list(value).map_err(DescriptorError::InvalidMediaType)? {
                target.push(MediaTypeExpression::new(media_type, expression.is_negated()));
            }
        }

        Ok(MappingDescriptor {
            name: self.name,
            path,
            methods: RequestMethodsCondition::new(self.methods),
            params: ParamsCondition::parse(&self.params)?,
            headers: HeadersCondition::parse(&self.headers)?,
            consumes: ConsumesCondition::new(consumes)
                .with_body_required(self.body_required.unwrap_or(true)),
            produces: ProducesCondition::new(produces, Arc::clone(&options.negotiator)),
            custom: self
                .custom
                .map(CustomConditionHolder::new)
                .unwrap_or_default(),
            options,
        })
    }
}

fn parse_media_expressions(raw: &[String]) -> Result<Vec<MediaTypeExpression>, DescriptorError> {
    raw.iter().map(|e| MediaTypeExpression::parse(e)).collect()
}

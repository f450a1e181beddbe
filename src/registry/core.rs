use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::RegistrationError;
use crate::handler::{HandlerId, HandlerMethod};
use crate::mapping::{MappingDescriptor, MappingDescriptorBuilder, MappingOptions};

/// One descriptor mapped to one handler.
#[derive(Debug)]
pub struct Registration {
    descriptor: MappingDescriptor,
    handler: Arc<HandlerMethod>,
    name: String,
}

impl Registration {
    #[must_use]
    pub fn descriptor(&self) -> &MappingDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<HandlerMethod> {
        &self.handler
    }

    /// Explicit mapping name, or `<bean initials>#<method>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.descriptor, self.handler.id())
    }
}

/// Immutable view of the registry at one point in time.
///
/// Dispatching threads hold an `Arc` of a snapshot for the duration of a
/// lookup; writers build a new snapshot and swap it in.
#[derive(Debug, Default, Clone)]
pub struct RegistrySnapshot {
    registrations: Vec<Arc<Registration>>,
    by_descriptor: HashMap<MappingDescriptor, Arc<Registration>>,
    direct: HashMap<String, Vec<Arc<Registration>>>,
    by_name: HashMap<String, Vec<Arc<Registration>>>,
}

impl RegistrySnapshot {
    /// All registrations in registration order.
    #[must_use]
    pub fn registrations(&self) -> &[Arc<Registration>] {
        &self.registrations
    }

    /// Registrations with a literal pattern equal to `path`.
    #[must_use]
    pub fn direct(&self, path: &str) -> &[Arc<Registration>] {
        self.direct.get(path).map_or(&[], Vec::as_slice)
    }

    fn insert(&mut self, registration: Arc<Registration>) {
        for path in registration.descriptor.path_condition().direct_paths() {
            self.direct
                .entry(path)
                .or_default()
                .push(Arc::clone(&registration));
        }
        self.by_name
            .entry(registration.name.clone())
            .or_default()
            .push(Arc::clone(&registration));
        self.by_descriptor
            .insert(registration.descriptor.clone(), Arc::clone(&registration));
        self.registrations.push(registration);
    }

    fn rebuilt_without(&self, removed: &Arc<Registration>) -> Self {
        let mut next = Self::default();
        for registration in &self.registrations {
            if !Arc::ptr_eq(registration, removed) {
                next.insert(Arc::clone(registration));
            }
        }
        next
    }
}

/// Default mapping name: the capital letters of the bean name, `#`, the
/// method name. `ItemController` / `show` becomes `IC#show`.
#[must_use]
pub fn default_mapping_name(id: &HandlerId) -> String {
    let initials: String = id.bean().chars().filter(char::is_ascii_uppercase).collect();
    format!("{initials}#{}", id.method())
}

/// Registry of descriptor → handler mappings.
///
/// Configured with one path strategy; descriptors built with the other are
/// rejected. Reads ([`snapshot`](Self::snapshot)) are lock-free, writes are
/// serialized and rebuild the indexes copy-on-write, so registering late
/// never blocks dispatching threads.
pub struct Registry {
    options: MappingOptions,
    state: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(MappingOptions::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.options)
            .field("registrations", &self.len())
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new(options: MappingOptions) -> Self {
        Self {
            options,
            state: ArcSwap::from_pointee(RegistrySnapshot::default()),
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(MappingOptions::from_config(config))
    }

    #[must_use]
    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    /// A descriptor builder carrying this registry's options.
    #[must_use]
    pub fn mapping<S: AsRef<str>>(&self, paths: &[S]) -> MappingDescriptorBuilder {
        MappingDescriptor::paths(paths).options(self.options.clone())
    }

    /// Current snapshot; cheap, lock-free.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.state.load_full()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.load().registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registrations in registration order.
    #[must_use]
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        self.state.load().registrations.clone()
    }

    /// Handlers registered under a mapping name.
    #[must_use]
    pub fn handlers_by_name(&self, name: &str) -> Vec<Arc<HandlerMethod>> {
        self.state
            .load()
            .by_name
            .get(name)
            .map(|found| found.iter().map(|r| Arc::clone(&r.handler)).collect())
            .unwrap_or_default()
    }

    /// The handler mapped to `descriptor`, if any.
    #[must_use]
    pub fn handler_for(&self, descriptor: &MappingDescriptor) -> Option<Arc<HandlerMethod>> {
        self.state
            .load()
            .by_descriptor
            .get(descriptor)
            .map(|r| Arc::clone(&r.handler))
    }

    /// Map `descriptor` to `handler`.
    ///
    /// # Errors
    ///
    /// * [`RegistrationError::StrategyMismatch`] when the descriptor was
    ///   built with the other path strategy
    /// * [`RegistrationError::DuplicateMapping`] when an equal descriptor is
    ///   already mapped to a different handler
    ///
    /// Registering the same pair twice is a no-op.
    pub fn register(
        &self,
        descriptor: MappingDescriptor,
        handler: HandlerMethod,
    ) -> Result<(), RegistrationError> {
        let expected = self.options.path_strategy;
        if descriptor.strategy() != expected {
            warn!(
                mapping = %descriptor,
                expected = %expected,
                found = %descriptor.strategy(),
                "Rejected mapping with foreign path strategy"
            );
            return Err(RegistrationError::StrategyMismatch {
                descriptor: descriptor.to_string(),
                expected,
                found: descriptor.strategy(),
            });
        }

        // An optional body parameter relaxes consumes for body-less requests
        let body_optional = handler.body_parameter().is_some_and(|p| p.is_optional());
        let descriptor = if body_optional && descriptor.consumes_condition().is_body_required() {
            descriptor.mutate().body_required(false).build()?
        } else {
            descriptor
        };

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load_full();
        if let Some(existing) = current.by_descriptor.get(&descriptor) {
            if existing.handler.id() == handler.id() {
                debug!(
                    mapping = %descriptor,
                    handler = %handler.id(),
                    "Mapping already registered"
                );
                return Ok(());
            }
            return Err(RegistrationError::DuplicateMapping {
                descriptor: descriptor.to_string(),
                existing: existing.handler.id().to_string(),
                attempted: handler.id().to_string(),
            });
        }

        let name = descriptor
            .name()
            .map_or_else(|| default_mapping_name(handler.id()), str::to_string);
        info!(
            mapping = %descriptor,
            handler = %handler.id(),
            name = %name,
            "Mapped handler"
        );
        let mut next = RegistrySnapshot::clone(&current);
        next.insert(Arc::new(Registration {
            descriptor,
            handler: Arc::new(handler),
            name,
        }));
        self.state.store(Arc::new(next));
        Ok(())
    }

    /// Remove the mapping for `descriptor`, returning its handler.
    pub fn unregister(&self, descriptor: &MappingDescriptor) -> Option<Arc<HandlerMethod>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load_full();
        let removed = Arc::clone(current.by_descriptor.get(descriptor)?);
        self.state.store(Arc::new(current.rebuilt_without(&removed)));
        info!(
            mapping = %removed.descriptor,
            handler = %removed.handler.id(),
            "Unmapped handler"
        );
        Some(Arc::clone(&removed.handler))
    }
}

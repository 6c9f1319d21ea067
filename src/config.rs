//! Container configuration.

use std::fmt;
use std::sync::Arc;

use crate::observer::{Observers, ResolutionObserver};
use crate::provider::Container;

/// Default limit on nested resolutions per resolve call.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options shared by a container and its children.
#[derive(Clone)]
pub struct ContainerOptions {
    /// Nested resolutions allowed before [`DiError::DepthExceeded`](crate::DiError::DepthExceeded).
    pub max_depth: usize,
    /// Build unregistered concrete classes on demand.
    pub auto_build: bool,
    pub(crate) observers: Observers,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            auto_build: true,
            observers: Observers::default(),
        }
    }
}

impl fmt::Debug for ContainerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOptions")
            .field("max_depth", &self.max_depth)
            .field("auto_build", &self.auto_build)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Builder for a configured root [`Container`].
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, TracingObserver};
/// use std::sync::Arc;
///
/// let container = Container::builder()
///     .max_depth(64)
///     .auto_build(false)
///     .observer(Arc::new(TracingObserver::new()))
///     .build();
///
/// assert_eq!(container.options().max_depth, 64);
/// assert!(!container.options().auto_build);
/// ```
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    options: ContainerOptions,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn auto_build(mut self, enabled: bool) -> Self {
        self.options.auto_build = enabled;
        self
    }

    /// Adds an observer notified of every resolution, nested ones included.
    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.options.observers.add(observer);
        self
    }

    pub fn build(self) -> Container {
        Container::with_options(self.options)
    }
}

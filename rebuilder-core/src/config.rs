use std::fmt;
use std::sync::Arc;

use crate::error::MutationError;
use crate::reactive::{FrameContext, HandlerOrder, HandlerRecord};

/// Container-level configuration.
///
/// Holds the global lifecycle handlers and creation behaviour shared by a
/// container and, when used through an [`InstanceRegistry`](crate::InstanceRegistry),
/// by every derived instance.
///
/// # Examples
///
/// ```rust
/// use rebuilder_core::{ContainerConfig, HandlerOrder};
///
/// let config = ContainerConfig::<i32>::default()
///     .with_lazy(true)
///     .with_handler_order(HandlerOrder::CallFirst)
///     .with_on_error(|_, err| eprintln!("counter failed: {err}"));
/// assert!(config.lazy());
/// ```
pub struct ContainerConfig<T> {
    pub(crate) handlers: Vec<HandlerRecord<T>>,

    /// Order in which global and call-level handlers run.
    /// Default: [`HandlerOrder::GlobalFirst`]
    handler_order: HandlerOrder,

    /// Defer running the producer until the container is first used.
    /// Default: false
    lazy: bool,

    /// Accept `set_state` on future and stream producers.
    /// Value producers always accept it.
    /// Default: false
    mutation_support: bool,

    /// Name used in log output.
    debug_name: Option<Arc<str>>,
}

impl<T> Default for ContainerConfig<T> {
    fn default() -> Self {
        ContainerConfig {
            handlers: Vec::new(),
            handler_order: HandlerOrder::GlobalFirst,
            lazy: false,
            mutation_support: false,
            debug_name: None,
        }
    }
}

impl<T> ContainerConfig<T> {
    pub fn with_on_data<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>, &T) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::Data(Arc::new(handler)));
        self
    }

    pub fn with_on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>, &MutationError) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::Error(Arc::new(handler)));
        self
    }

    pub fn with_on_set_state<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::SetState(Arc::new(handler)));
        self
    }

    pub fn with_on_rebuild_state<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::RebuildState(Arc::new(handler)));
        self
    }

    pub fn with_handler_order(mut self, order: HandlerOrder) -> Self {
        self.handler_order = order;
        self
    }

    pub fn handler_order(&self) -> HandlerOrder {
        self.handler_order
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn lazy(&self) -> bool {
        self.lazy
    }

    pub fn with_mutation_support(mut self, supported: bool) -> Self {
        self.mutation_support = supported;
        self
    }

    pub fn mutation_support(&self) -> bool {
        self.mutation_support
    }

    pub fn with_debug_name(mut self, name: impl AsRef<str>) -> Self {
        self.debug_name = Some(Arc::from(name.as_ref()));
        self
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }
}

impl<T> Clone for ContainerConfig<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            handler_order: self.handler_order,
            lazy: self.lazy,
            mutation_support: self.mutation_support,
            debug_name: self.debug_name.clone(),
        }
    }
}

impl<T> fmt::Debug for ContainerConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("handlers", &self.handlers)
            .field("handler_order", &self.handler_order)
            .field("lazy", &self.lazy)
            .field("mutation_support", &self.mutation_support)
            .field("debug_name", &self.debug_name)
            .finish()
    }
}

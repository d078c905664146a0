//! Per-call options for `set_state`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::handlers::HandlerRecord;
use super::{FrameContext, Tag};
use crate::error::MutationError;

/// Comparison key produced by a watch function.
///
/// Implemented for every `PartialEq` type, so a watch function can return
/// whatever is convenient (a field, a tuple, a `String`...). Keys of
/// different types never compare equal.
pub trait WatchKey: Any + Send + Sync {
    fn key_eq(&self, other: &dyn WatchKey) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<K> WatchKey for K
where
    K: PartialEq + Send + Sync + 'static,
{
    fn key_eq(&self, other: &dyn WatchKey) -> bool {
        other
            .as_any()
            .downcast_ref::<K>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) type WatchFn<T> = Arc<dyn Fn(&T) -> Box<dyn WatchKey> + Send + Sync>;

/// Options recognised by `set_state`.
///
/// ```rust,ignore
/// let options = SetStateOptions::new()
///     .catch_error(true)
///     .watch(|todo: &Todo| todo.done)
///     .filter_tags(["header"]);
/// ```
pub struct SetStateOptions<T> {
    pub(crate) catch_error: bool,
    pub(crate) silent: bool,
    pub(crate) should_await: bool,
    pub(crate) watch: Option<WatchFn<T>>,
    pub(crate) filter_tags: SmallVec<[Tag; 2]>,
    pub(crate) seeds: SmallVec<[String; 2]>,
    pub(crate) join_singleton: bool,
    pub(crate) join_singleton_to_new_data: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    pub(crate) notify_all_reactive_instances: bool,
    pub(crate) handlers: Vec<HandlerRecord<T>>,
}

impl<T> SetStateOptions<T> {
    pub fn new() -> Self {
        Self {
            catch_error: false,
            silent: false,
            should_await: false,
            watch: None,
            filter_tags: SmallVec::new(),
            seeds: SmallVec::new(),
            join_singleton: false,
            join_singleton_to_new_data: None,
            notify_all_reactive_instances: false,
            handlers: Vec::new(),
        }
    }

    /// Record failures in the snapshot instead of returning them.
    pub fn catch_error(mut self, catch_error: bool) -> Self {
        self.catch_error = catch_error;
        self
    }

    /// Update state without notifying any observer.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Make `set_state_async` wait for the asynchronous part to settle.
    pub fn should_await(mut self, should_await: bool) -> Self {
        self.should_await = should_await;
        self
    }

    /// Skip notification when `key(new_value)` equals the last notified key.
    pub fn watch<K, F>(mut self, key: F) -> Self
    where
        T: 'static,
        K: PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.watch = Some(Arc::new(move |value: &T| Box::new(key(value)) as Box<dyn WatchKey>));
        self
    }

    /// Only notify observers subscribed under one of these tags.
    pub fn filter_tags<I, G>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Tag>,
    {
        self.filter_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Copy the resulting snapshot onto these sibling instances.
    pub fn seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds = seeds.into_iter().map(Into::into).collect();
        self
    }

    /// Push the resulting snapshot of a derived instance onto the singleton.
    pub fn join_singleton(mut self, join: bool) -> Self {
        self.join_singleton = join;
        self
    }

    /// Data the singleton adopts when `join_singleton` fires.
    pub fn join_singleton_to_new_data<F>(mut self, data: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.join_singleton = true;
        self.join_singleton_to_new_data = Some(Arc::new(data));
        self
    }

    /// Rebuild the observers of every sibling instance as well.
    pub fn notify_all_reactive_instances(mut self, notify: bool) -> Self {
        self.notify_all_reactive_instances = notify;
        self
    }

    pub fn on_set_state<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::SetState(Arc::new(handler)));
        self
    }

    pub fn on_rebuild_state<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::RebuildState(Arc::new(handler)));
        self
    }

    pub fn on_data<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>, &T) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::Data(Arc::new(handler)));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&FrameContext>, &MutationError) + Send + Sync + 'static,
    {
        self.handlers.push(HandlerRecord::Error(Arc::new(handler)));
        self
    }

    pub(crate) fn watch_key(&self, value: &T) -> Option<Box<dyn WatchKey>> {
        self.watch.as_ref().map(|watch| watch(value))
    }
}

impl<T> Default for SetStateOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SetStateOptions<T> {
    fn clone(&self) -> Self {
        Self {
            catch_error: self.catch_error,
            silent: self.silent,
            should_await: self.should_await,
            watch: self.watch.clone(),
            filter_tags: self.filter_tags.clone(),
            seeds: self.seeds.clone(),
            join_singleton: self.join_singleton,
            join_singleton_to_new_data: self.join_singleton_to_new_data.clone(),
            notify_all_reactive_instances: self.notify_all_reactive_instances,
            handlers: self.handlers.clone(),
        }
    }
}

impl<T> fmt::Debug for SetStateOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetStateOptions")
            .field("catch_error", &self.catch_error)
            .field("silent", &self.silent)
            .field("should_await", &self.should_await)
            .field("watch", &self.watch.is_some())
            .field("filter_tags", &self.filter_tags)
            .field("seeds", &self.seeds)
            .field("join_singleton", &self.join_singleton)
            .field("notify_all_reactive_instances", &self.notify_all_reactive_instances)
            .field("handlers", &self.handlers)
            .finish()
    }
}

//! Reactive Container
//!
//! A [`ReactiveContainer`] wraps one value together with the status of the
//! latest operation performed on it, and notifies its observers whenever a
//! new [`Snapshot`] is committed.
//!
//! # Mutation paths
//!
//! `set_state` runs the mutation against a working copy of the current value
//! and classifies the returned [`MutationOutcome`]:
//!
//! 1. `InPlace` / `Sync`: the result is committed as a `done` snapshot before
//!    `set_state` returns.
//!
//! 2. `Async`: a `waiting` snapshot is committed immediately, the future is
//!    spawned on the current tokio runtime, and its result is committed as
//!    `done` when it settles.
//!
//! 3. `Streaming`: like `Async`, except that every emission is committed as
//!    an `active` snapshot. The spawned task is the container's active
//!    subscription and is aborted when a newer mutation starts.
//!
//! # Generations
//!
//! Every mutation starts a new generation. A completion that belongs to an
//! older generation is dropped instead of committed, so a slow future can
//! never overwrite the result of a newer `set_state`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use super::handlers::{Dispatcher, HandlerEvent};
use super::options::WatchKey;
use super::{
    ConnectionStatus, MutationOutcome, Observer, ObserverRegistry, Producer, SetStateOptions,
    Snapshot, SubscriptionHandle, Tag,
};
use crate::config::ContainerConfig;
use crate::error::{MutationError, Result, StateError};
use crate::registry::Propagate;

static CONTAINER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Orders data commits across containers ("most recently resolved").
static RESOLUTION_CLOCK: AtomicU64 = AtomicU64::new(0);

fn next_container_id() -> u64 {
    CONTAINER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// What kind of step a commit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Waiting,
    Data,
    Error,
    /// Explicit transitions (`reset_*`).
    Reset,
    /// A value producer (re)created its value. Never propagated.
    Init,
}

struct State<T> {
    snapshot: Snapshot<T>,
    generation: u64,
    /// Running stream task, if any.
    active: Option<AbortHandle>,
    last_watch_key: Option<Box<dyn WatchKey>>,
    stream_done: bool,
    initialized: bool,
    resolved_at: u64,
    /// Dropped on dispose so pending `state_async` calls wake up.
    snapshots: Option<watch::Sender<Snapshot<T>>>,
}

impl<T> State<T> {
    /// Invalidate in-flight completions and cancel the running stream.
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            active.abort();
        }
        self.stream_done = false;
        self.generation
    }
}

struct Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: u64,
    label: Arc<str>,
    seed: Option<String>,
    producer: Producer<T>,
    config: ContainerConfig<T>,
    state: Mutex<State<T>>,
    observers: ObserverRegistry,
    registry: OnceLock<Weak<dyn Propagate<T>>>,
    disposed: AtomicBool,
}

/// A shared, observable value with a connection status.
///
/// Cloning a container is cheap and yields another handle to the same state.
///
/// # Example
///
/// ```rust
/// use rebuilder_core::{MutationOutcome, ReactiveContainer, SetStateOptions};
///
/// let counter = ReactiveContainer::new(0);
/// counter
///     .set_state(|n| MutationOutcome::value(*n + 1), SetStateOptions::new())
///     .unwrap();
/// assert_eq!(counter.state(), Some(1));
/// assert!(counter.has_data());
/// ```
pub struct ReactiveContainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<T>>,
}

impl<T> ReactiveContainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a container holding `value`. `refresh` restores this value.
    pub fn new(value: T) -> Self {
        let container = Self::from_parts(
            Producer::value(move || value.clone()),
            ContainerConfig::default(),
            None,
        );
        container.inner.state.lock().initialized = true;
        container.init_value();
        container
    }

    /// Start building a container from a producer and a configuration.
    pub fn builder() -> ContainerBuilder<T> {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(
        producer: Producer<T>,
        config: ContainerConfig<T>,
        seed: Option<String>,
    ) -> Self {
        let id = next_container_id();
        let label: Arc<str> = match (config.debug_name(), seed.as_deref()) {
            (Some(name), Some(seed)) => Arc::from(format!("{name}[{seed}]")),
            (Some(name), None) => Arc::from(name),
            (None, Some(seed)) => Arc::from(format!("#{id}[{seed}]")),
            (None, None) => Arc::from(format!("#{id}")),
        };
        let (sender, _) = watch::channel(Snapshot::idle(None));

        Self {
            inner: Arc::new(Inner {
                id,
                label,
                seed,
                producer,
                config,
                state: Mutex::new(State {
                    snapshot: Snapshot::idle(None),
                    generation: 0,
                    active: None,
                    last_watch_key: None,
                    stream_done: false,
                    initialized: false,
                    resolved_at: 0,
                    snapshots: Some(sender),
                }),
                observers: ObserverRegistry::new(),
                registry: OnceLock::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn attach_registry(&self, registry: Weak<dyn Propagate<T>>) {
        if self.inner.registry.set(registry).is_err() {
            tracing::warn!(container = %self.inner.label, "container already belongs to a registry");
        }
    }

    fn registry(&self) -> Option<Arc<dyn Propagate<T>>> {
        self.inner.registry.get().and_then(Weak::upgrade)
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Process-unique identifier, also used in log output.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The seed of a derived instance; `None` for a singleton.
    pub fn seed(&self) -> Option<&str> {
        self.inner.seed.as_deref()
    }

    /// True unless the container was created for a seed.
    pub fn is_singleton(&self) -> bool {
        self.inner.seed.is_none()
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Readback
    // ------------------------------------------------------------------

    /// The latest committed snapshot.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.touch();
        self.inner.state.lock().snapshot.clone()
    }

    /// The current value, if one was ever produced.
    pub fn state(&self) -> Option<T> {
        self.touch();
        self.current_data()
    }

    /// Status of the latest operation.
    pub fn status(&self) -> ConnectionStatus {
        self.snapshot().status()
    }

    /// A value was produced and no error is recorded.
    pub fn has_data(&self) -> bool {
        self.snapshot().has_data()
    }

    /// The latest commit recorded an error.
    pub fn has_error(&self) -> bool {
        self.snapshot().has_error()
    }

    /// An operation is in flight.
    pub fn is_waiting(&self) -> bool {
        self.snapshot().is_waiting()
    }

    /// No operation has run, or the container was reset to idle.
    pub fn is_idle(&self) -> bool {
        self.snapshot().is_idle()
    }

    /// A stream has emitted and may emit again.
    pub fn is_active(&self) -> bool {
        self.snapshot().is_active()
    }

    /// The recorded error, if any.
    pub fn error(&self) -> Option<MutationError> {
        self.snapshot().error().cloned()
    }

    /// The stream feeding this container has finished.
    pub fn is_stream_done(&self) -> bool {
        self.inner.state.lock().stream_done
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Resolve with the value once no operation is in flight.
    ///
    /// Returns immediately when the container is not waiting. Fails with the
    /// recorded error if the settled snapshot carries one.
    pub async fn state_async(&self) -> Result<T> {
        self.ensure_initialized()?;
        let mut snapshots = self.snapshots()?;
        loop {
            {
                let snapshot = snapshots.borrow_and_update();
                if !snapshot.is_waiting() {
                    if let Some(error) = snapshot.error() {
                        return Err(StateError::Mutation(error.clone()));
                    }
                    return snapshot
                        .data()
                        .cloned()
                        .ok_or_else(|| StateError::invalid_operation("container has no value"));
                }
            }
            snapshots
                .changed()
                .await
                .map_err(|_| StateError::Disposed)?;
        }
    }

    /// Follow every committed snapshot.
    pub fn snapshots(&self) -> Result<watch::Receiver<Snapshot<T>>> {
        self.inner
            .state
            .lock()
            .snapshots
            .as_ref()
            .map(watch::Sender::subscribe)
            .ok_or(StateError::Disposed)
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Rebuild `observer` after every notifying commit.
    pub fn subscribe<O: Observer>(&self, observer: O) -> SubscriptionHandle {
        self.attach(Arc::new(observer), None)
    }

    /// Like `subscribe`, but reachable by `filter_tags`.
    pub fn subscribe_with_tag<O: Observer>(&self, observer: O, tag: impl Into<Tag>) -> SubscriptionHandle {
        self.attach(Arc::new(observer), Some(tag.into()))
    }

    /// Subscribe an already shared observer, optionally tagged.
    pub fn attach(&self, observer: Arc<dyn Observer>, tag: Option<Tag>) -> SubscriptionHandle {
        if self.is_disposed() {
            tracing::warn!(container = %self.inner.label, "subscribing to a disposed container");
        }
        self.touch();
        self.inner.observers.subscribe(observer, tag)
    }

    /// Detach an observer. Unknown handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.observers.unsubscribe(handle)
    }

    /// Number of subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Rebuild every observer without touching the snapshot.
    pub fn notify(&self) -> usize {
        self.inner.observers.notify(&[])
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Run `mutation` against the current value and commit what it returns.
    ///
    /// Synchronous failures are returned here unless `catch_error` is set.
    /// For asynchronous outcomes this returns as soon as the `waiting`
    /// snapshot is committed; the returned [`Completion`] resolves when the
    /// work settles.
    pub fn set_state<F>(&self, mutation: F, options: SetStateOptions<T>) -> Result<Completion>
    where
        F: FnOnce(&mut T) -> MutationOutcome<T>,
    {
        self.ensure_mutable()?;
        self.ensure_initialized()?;

        let mut working = self
            .current_data()
            .ok_or_else(|| StateError::invalid_operation("container has no value to mutate yet"))?;
        let outcome = mutation(&mut working);
        tracing::debug!(container = %self.inner.label, kind = outcome.kind(), "set_state");

        let runtime = match outcome {
            MutationOutcome::Async(_) | MutationOutcome::Streaming(_) => {
                Some(Handle::try_current().map_err(|_| StateError::NoRuntime)?)
            }
            // Nothing gets committed, so work already in flight stays current.
            MutationOutcome::Sync(Err(error)) if !options.catch_error => {
                tracing::debug!(container = %self.inner.label, error = %error, "mutation failed");
                return Err(StateError::Mutation(error));
            }
            _ => None,
        };

        let generation = self.begin_generation();
        match (outcome, runtime) {
            (MutationOutcome::InPlace, _) => Ok(self.settle_sync(generation, Ok(working), &options)),
            (MutationOutcome::Sync(result), _) => Ok(self.settle_sync(generation, result, &options)),
            (MutationOutcome::Async(future), Some(runtime)) => {
                Ok(self.run_future(&runtime, generation, future, options))
            }
            (MutationOutcome::Streaming(stream), Some(runtime)) => {
                Ok(self.run_stream(&runtime, generation, stream, options))
            }
            (_, None) => Err(StateError::NoRuntime),
        }
    }

    /// `set_state`, then wait for the asynchronous part when `should_await` is set.
    pub async fn set_state_async<F>(&self, mutation: F, options: SetStateOptions<T>) -> Result<()>
    where
        F: FnOnce(&mut T) -> MutationOutcome<T>,
    {
        let should_await = options.should_await;
        let completion = self.set_state(mutation, options)?;
        if should_await {
            completion.wait().await
        } else {
            Ok(())
        }
    }

    /// Run the producer again.
    ///
    /// A value producer re-creates its value and goes back to idle; future
    /// and stream producers go through the asynchronous path again.
    pub fn refresh(&self) -> Result<Completion> {
        if self.is_disposed() {
            return Err(StateError::invalid_operation("cannot refresh a disposed container"));
        }
        self.inner.state.lock().initialized = true;
        self.run_producer()
    }

    /// Back to `none`, keeping the value and clearing any error.
    pub fn reset_to_idle(&self) {
        self.transition(|snapshot| snapshot.with_status(ConnectionStatus::None), Step::Reset);
    }

    /// Clear any error and mark the current value as good data.
    pub fn reset_to_has_data(&self) {
        self.transition(|snapshot| snapshot.with_status(ConnectionStatus::Done), Step::Reset);
    }

    /// Mark an operation as in flight, keeping the value.
    pub fn set_to_is_waiting(&self) {
        self.transition(|snapshot| snapshot.with_status(ConnectionStatus::Waiting), Step::Waiting);
    }

    /// Record `error` with status `done`, keeping the value.
    pub fn set_to_has_error(&self, error: impl Into<MutationError>) {
        let error = error.into();
        self.transition(
            move |snapshot| Snapshot::failed(ConnectionStatus::Done, snapshot.data().cloned(), error),
            Step::Error,
        );
    }

    /// Cancel any running subscription, invalidate in-flight completions and
    /// detach every observer.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            state.next_generation();
            state.snapshots = None;
        }
        self.inner.observers.clear();
        tracing::debug!(container = %self.inner.label, "disposed");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(StateError::invalid_operation("cannot mutate a disposed container"));
        }
        if !self.inner.producer.is_value() && !self.inner.config.mutation_support() {
            return Err(StateError::invalid_operation(format!(
                "container {} is backed by a {:?} without mutation support",
                self.inner.label, self.inner.producer
            )));
        }
        Ok(())
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.initialized {
                return Ok(());
            }
            state.initialized = true;
        }
        if let Err(e) = self.run_producer() {
            self.inner.state.lock().initialized = false;
            return Err(e);
        }
        Ok(())
    }

    /// Lazy initialization from an infallible accessor.
    fn touch(&self) {
        if let Err(e) = self.ensure_initialized() {
            tracing::warn!(container = %self.inner.label, error = %e, "lazy initialization failed");
        }
    }

    fn run_producer(&self) -> Result<Completion> {
        let options = SetStateOptions::new().catch_error(true);
        match &self.inner.producer {
            Producer::Value(_) => {
                self.init_value();
                Ok(Completion::ready())
            }
            Producer::Future(factory) => {
                let runtime = Handle::try_current().map_err(|_| StateError::NoRuntime)?;
                let generation = self.begin_generation();
                Ok(self.run_future(&runtime, generation, factory(), options))
            }
            Producer::Stream(factory) => {
                let runtime = Handle::try_current().map_err(|_| StateError::NoRuntime)?;
                let generation = self.begin_generation();
                Ok(self.run_stream(&runtime, generation, factory(), options))
            }
        }
    }

    fn init_value(&self) {
        if let Producer::Value(factory) = &self.inner.producer {
            let value = factory();
            let generation = self.begin_generation();
            self.commit(generation, Snapshot::idle(Some(value)), Step::Init, &SetStateOptions::new());
        }
    }

    fn current_data(&self) -> Option<T> {
        self.inner.state.lock().snapshot.data().cloned()
    }

    /// Snapshot and resolution time, read together.
    pub(crate) fn resolution(&self) -> (u64, Snapshot<T>) {
        let state = self.inner.state.lock();
        (state.resolved_at, state.snapshot.clone())
    }

    fn begin_generation(&self) -> u64 {
        self.inner.state.lock().next_generation()
    }

    fn transition<F>(&self, build: F, step: Step)
    where
        F: FnOnce(&Snapshot<T>) -> Snapshot<T>,
    {
        let generation = self.begin_generation();
        let snapshot = build(&self.inner.state.lock().snapshot);
        self.commit(generation, snapshot, step, &SetStateOptions::new());
    }

    fn settle_sync(
        &self,
        generation: u64,
        result: std::result::Result<T, MutationError>,
        options: &SetStateOptions<T>,
    ) -> Completion {
        match result {
            Ok(value) => {
                self.commit(generation, Snapshot::done(value), Step::Data, options);
            }
            Err(error) => {
                let snapshot = Snapshot::failed(ConnectionStatus::Done, self.current_data(), error);
                self.commit(generation, snapshot, Step::Error, options);
            }
        }
        Completion::ready()
    }

    fn run_future(
        &self,
        runtime: &Handle,
        generation: u64,
        future: BoxFuture<'static, std::result::Result<T, MutationError>>,
        options: SetStateOptions<T>,
    ) -> Completion {
        let waiting = self.inner.state.lock().snapshot.with_status(ConnectionStatus::Waiting);
        self.commit(generation, waiting, Step::Waiting, &options);

        let state = self.inner.state.lock();
        if state.generation != generation {
            // An observer started a newer mutation while being notified.
            return Completion::ready();
        }
        let this = self.clone();
        let task = runtime.spawn(async move {
            let result = future.await;
            this.settle_future(generation, result, &options)
        });
        drop(state);
        Completion::pending(task)
    }

    fn settle_future(
        &self,
        generation: u64,
        result: std::result::Result<T, MutationError>,
        options: &SetStateOptions<T>,
    ) -> Result<()> {
        match result {
            Ok(value) => {
                if !self.commit(generation, Snapshot::done(value), Step::Data, options) {
                    tracing::debug!(container = %self.inner.label, "discarding stale completion");
                }
                Ok(())
            }
            Err(error) => {
                let snapshot = Snapshot::failed(ConnectionStatus::Done, self.current_data(), error.clone());
                if !self.commit(generation, snapshot, Step::Error, options) {
                    tracing::debug!(container = %self.inner.label, "discarding stale failure");
                    return Ok(());
                }
                if options.catch_error {
                    Ok(())
                } else {
                    tracing::error!(container = %self.inner.label, error = %error, "uncaught asynchronous mutation failure");
                    Err(StateError::Mutation(error))
                }
            }
        }
    }

    fn run_stream(
        &self,
        runtime: &Handle,
        generation: u64,
        mut stream: BoxStream<'static, std::result::Result<T, MutationError>>,
        options: SetStateOptions<T>,
    ) -> Completion {
        let waiting = self.inner.state.lock().snapshot.with_status(ConnectionStatus::Waiting);
        self.commit(generation, waiting, Step::Waiting, &options);

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return Completion::ready();
        }
        let this = self.clone();
        // Spawned under the state lock so the abort handle is in place
        // before the task can commit anything.
        let task = runtime.spawn(async move {
            let mut uncaught = None;
            while let Some(item) = stream.next().await {
                let committed = match item {
                    Ok(value) => this.commit(generation, Snapshot::active(value), Step::Data, &options),
                    Err(error) => {
                        let snapshot =
                            Snapshot::failed(ConnectionStatus::Active, this.current_data(), error.clone());
                        let committed = this.commit(generation, snapshot, Step::Error, &options);
                        if committed && !options.catch_error {
                            tracing::error!(container = %this.inner.label, error = %error, "uncaught stream failure");
                            uncaught.get_or_insert(error);
                        }
                        committed
                    }
                };
                if !committed {
                    tracing::debug!(container = %this.inner.label, "stream superseded");
                    return Ok(());
                }
            }
            this.finish_stream(generation, &options);
            match uncaught {
                Some(error) => Err(StateError::Mutation(error)),
                None => Ok(()),
            }
        });
        state.active = Some(task.abort_handle());
        drop(state);
        Completion::pending(task)
    }

    /// Mark the stream done. A stream that never emitted settles to `done`
    /// with the value it started from.
    fn finish_stream(&self, generation: u64, options: &SetStateOptions<T>) {
        let settled = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            state.stream_done = true;
            state.active = None;
            tracing::debug!(container = %self.inner.label, "stream done");
            state
                .snapshot
                .is_waiting()
                .then(|| state.snapshot.with_status(ConnectionStatus::Done))
        };
        if let Some(snapshot) = settled {
            self.commit(generation, snapshot, Step::Reset, options);
        }
    }

    /// Swap in `snapshot`, run handlers, notify and propagate.
    ///
    /// Returns `false` without doing anything if `generation` is stale.
    /// Observers are notified before the registry propagates to siblings.
    fn commit(
        &self,
        generation: u64,
        snapshot: Snapshot<T>,
        step: Step,
        options: &SetStateOptions<T>,
    ) -> bool {
        let notify = {
            let mut state = self.inner.state.lock();
            if generation != state.generation {
                return false;
            }

            let mut notify = !options.silent;
            if step == Step::Data {
                state.resolved_at = RESOLUTION_CLOCK.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(key) = snapshot.data().and_then(|value| options.watch_key(value)) {
                    let unchanged = state
                        .last_watch_key
                        .as_ref()
                        .is_some_and(|last| last.key_eq(&*key));
                    if unchanged {
                        notify = false;
                    } else {
                        state.last_watch_key = Some(key);
                    }
                }
            }

            state.snapshot = snapshot.clone();
            if let Some(sender) = &state.snapshots {
                sender.send_replace(snapshot.clone());
            }
            notify
        };

        tracing::debug!(
            container = %self.inner.label,
            status = %snapshot.status(),
            has_error = snapshot.has_error(),
            notify,
            "committed snapshot"
        );

        let context = self.inner.observers.first_context();
        let dispatcher = Dispatcher {
            global: &self.inner.config.handlers,
            call: &options.handlers,
            order: self.inner.config.handler_order(),
        };
        let settled = matches!(step, Step::Data | Step::Error);

        if settled {
            dispatcher.dispatch(context.as_ref(), HandlerEvent::SetState);
        }
        match step {
            Step::Data => {
                if let Some(value) = snapshot.data() {
                    dispatcher.dispatch(context.as_ref(), HandlerEvent::Data(value));
                }
            }
            Step::Error => {
                if let Some(error) = snapshot.error() {
                    dispatcher.dispatch(context.as_ref(), HandlerEvent::Error(error));
                }
            }
            Step::Waiting | Step::Reset | Step::Init => {}
        }

        if notify {
            self.inner.observers.notify(&options.filter_tags);
            if settled {
                dispatcher.dispatch(context.as_ref(), HandlerEvent::RebuildState);
            }
        }

        if step != Step::Init {
            if let Some(registry) = self.registry() {
                registry.after_commit(self, &snapshot, options);
            }
        }
        true
    }

    /// Replace the snapshot with one computed elsewhere (joins and seeds).
    ///
    /// Starts a new generation: the target's own future or stream in flight
    /// is superseded by the adopted snapshot.
    pub(crate) fn adopt(&self, snapshot: Snapshot<T>, notify: bool) {
        {
            let mut state = self.inner.state.lock();
            state.next_generation();
            state.snapshot = snapshot.clone();
            if let Some(sender) = &state.snapshots {
                sender.send_replace(snapshot);
            }
        }
        tracing::debug!(container = %self.inner.label, "adopted snapshot");
        if notify {
            self.inner.observers.notify(&[]);
        }
    }
}

impl<T> Clone for ReactiveContainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ReactiveContainer<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ReactiveContainer")
            .field("label", &self.inner.label)
            .field("snapshot", &state.snapshot)
            .field("generation", &state.generation)
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

/// Handle on the asynchronous part of a mutation.
///
/// Dropping it does not cancel anything; observers are notified either way.
#[derive(Debug)]
pub struct Completion {
    task: Option<JoinHandle<Result<()>>>,
}

impl Completion {
    fn ready() -> Self {
        Self { task: None }
    }

    fn pending(task: JoinHandle<Result<()>>) -> Self {
        Self { task: Some(task) }
    }

    /// The asynchronous part is still running.
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the work to settle.
    ///
    /// Yields the uncaught failure when `catch_error` was off. A subscription
    /// cancelled by a newer mutation resolves to `Ok(())`.
    pub async fn wait(self) -> Result<()> {
        let Some(task) = self.task else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(StateError::internal(e)),
        }
    }
}

/// Builds a [`ReactiveContainer`] from a producer and a configuration.
pub struct ContainerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    producer: Option<Producer<T>>,
    config: ContainerConfig<T>,
}

impl<T> ContainerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            producer: None,
            config: ContainerConfig::default(),
        }
    }

    pub fn producer(mut self, producer: Producer<T>) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn value(self, value: T) -> Self {
        self.producer(Producer::value(move || value.clone()))
    }

    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.producer(Producer::value(factory))
    }

    pub fn config(mut self, config: ContainerConfig<T>) -> Self {
        self.config = config;
        self
    }

    /// Fails with [`StateError::Configuration`] when no producer was given.
    /// An eager future or stream producer also needs a tokio runtime.
    pub fn build(self) -> Result<ReactiveContainer<T>> {
        let producer = self
            .producer
            .ok_or_else(|| StateError::configuration("a container needs a producer"))?;
        let lazy = self.config.lazy();
        let container = ReactiveContainer::from_parts(producer, self.config, None);
        if !lazy {
            container.ensure_initialized()?;
        }
        Ok(container)
    }
}

impl<T> Default for ContainerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

//! Integration Tests for Reactive Containers
//!
//! These tests drive containers and registries through the public API the
//! way a UI binding would: subscribe observers, mutate, read back.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use rebuilder_core::{
    ConnectionStatus, ContainerConfig, FrameContext, HandlerOrder, InstanceRegistry, JoinPolicy,
    MutationError, MutationOutcome, Observer, Producer, ReactiveContainer, SetStateOptions,
    Snapshot, StateError, SubscriptionHandle,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Subscribe an observer that counts its rebuilds.
fn counter<T>(container: &ReactiveContainer<T>) -> Arc<AtomicUsize>
where
    T: Clone + Send + Sync + 'static,
{
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    container.subscribe(move |_: SubscriptionHandle| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    count
}

/// A stream fed by hand, one item at a time.
fn channel_stream<T>() -> (
    mpsc::UnboundedSender<Result<T, MutationError>>,
    impl Stream<Item = Result<T, MutationError>> + Send + 'static,
)
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (tx, stream)
}

/// A future resolved by hand.
fn pending_value(rx: oneshot::Receiver<Result<i32, MutationError>>) -> MutationOutcome<i32> {
    MutationOutcome::future(async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(MutationError::new("sender dropped")),
        }
    })
}

async fn next_commit<T>(snapshots: &mut watch::Receiver<Snapshot<T>>) -> Snapshot<T>
where
    T: Clone,
{
    snapshots.changed().await.expect("container alive");
    snapshots.borrow_and_update().clone()
}

// ----------------------------------------------------------------------------
// Synchronous mutations
// ----------------------------------------------------------------------------

/// A fresh container is idle, without data or error.
#[test]
fn fresh_container_is_idle() {
    let container = ReactiveContainer::new("hello".to_string());
    assert_eq!(container.status(), ConnectionStatus::None);
    assert!(!container.has_data());
    assert!(!container.has_error());
    assert!(container.is_idle());
}

/// Sync mutation goes straight to done and notifies exactly once.
#[test]
fn sync_mutation_is_observable_after_return() {
    init_tracing();
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);

    container
        .set_state(|n| MutationOutcome::value(*n + 10), SetStateOptions::new())
        .expect("set_state");

    assert_eq!(container.status(), ConnectionStatus::Done);
    assert!(container.has_data());
    assert_eq!(container.state(), Some(10));
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
}

/// Uncaught sync failures reach the caller and change nothing.
#[test]
fn sync_failure_without_catch_propagates() {
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);

    let result = container.set_state(|_| MutationOutcome::fail("nope"), SetStateOptions::new());

    match result {
        Err(StateError::Mutation(e)) => assert_eq!(e.message(), "nope"),
        other => panic!("expected mutation error, got {other:?}"),
    }
    assert!(container.is_idle());
    assert!(!container.has_error());
    assert_eq!(rebuilds.load(Ordering::SeqCst), 0);
}

/// Caught sync failures are recorded and swallowed.
#[test]
fn sync_failure_with_catch_is_recorded() {
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);

    container
        .set_state(|_| MutationOutcome::fail("nope"), SetStateOptions::new().catch_error(true))
        .expect("caught");

    assert!(container.has_error());
    assert_eq!(container.error().expect("error").message(), "nope");
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
}

/// Only observers under a matching tag are notified.
#[test]
fn tag_filter_limits_notification() {
    let container = ReactiveContainer::new(0);
    let untagged = counter(&container);
    let tagged = Arc::new(AtomicUsize::new(0));
    let tagged_clone = tagged.clone();
    container.subscribe_with_tag(
        move |_: SubscriptionHandle| {
            tagged_clone.fetch_add(1, Ordering::SeqCst);
        },
        "t",
    );

    container
        .set_state(|_| MutationOutcome::value(1), SetStateOptions::new().filter_tags(["t"]))
        .expect("set_state");
    assert_eq!(tagged.load(Ordering::SeqCst), 1);
    assert_eq!(untagged.load(Ordering::SeqCst), 0);

    container
        .set_state(|_| MutationOutcome::value(2), SetStateOptions::new().filter_tags(["x"]))
        .expect("set_state");
    assert_eq!(tagged.load(Ordering::SeqCst), 1);
    assert_eq!(untagged.load(Ordering::SeqCst), 0);
    assert_eq!(container.state(), Some(2));
}

/// Unsubscribing one observer leaves the others alone.
#[test]
fn unsubscribe_affects_only_that_observer() {
    let container = ReactiveContainer::new(0);
    let kept = counter(&container);
    let dropped = Arc::new(AtomicUsize::new(0));
    let dropped_clone = dropped.clone();
    let handle = container.subscribe(move |_: SubscriptionHandle| {
        dropped_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(container.observer_count(), 2);
    assert!(container.unsubscribe(handle));
    assert_eq!(container.observer_count(), 1);
    assert!(!container.unsubscribe(handle));

    container
        .set_state(|_| MutationOutcome::value(1), SetStateOptions::new())
        .expect("set_state");
    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);
}

/// Watch keys suppress rebuilds while still updating state.
#[test]
fn watch_skips_rebuild_but_updates_state() {
    #[derive(Clone)]
    struct Form {
        name: String,
        keystrokes: u32,
    }

    let container = ReactiveContainer::new(Form {
        name: "a".into(),
        keystrokes: 0,
    });
    let rebuilds = counter(&container);
    let by_name = || SetStateOptions::new().watch(|form: &Form| form.name.clone());

    container
        .set_state(
            |form| {
                form.keystrokes += 1;
                MutationOutcome::in_place()
            },
            by_name(),
        )
        .expect("set_state");
    container
        .set_state(
            |form| {
                form.keystrokes += 1;
                MutationOutcome::in_place()
            },
            by_name(),
        )
        .expect("set_state");
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
    assert_eq!(container.state().map(|f| f.keystrokes), Some(2));

    container
        .set_state(
            |form| {
                form.name = "b".into();
                MutationOutcome::in_place()
            },
            by_name(),
        )
        .expect("set_state");
    assert_eq!(rebuilds.load(Ordering::SeqCst), 2);
}

/// Resets replace the snapshot but keep the value.
#[test]
fn resets_after_error() {
    let container = ReactiveContainer::new(3);
    container
        .set_state(|_| MutationOutcome::fail("bad"), SetStateOptions::new().catch_error(true))
        .expect("caught");
    assert!(container.has_error());

    container.reset_to_idle();
    assert_eq!(container.status(), ConnectionStatus::None);

    container
        .set_state(|_| MutationOutcome::fail("bad"), SetStateOptions::new().catch_error(true))
        .expect("caught");
    container.reset_to_has_data();
    assert!(container.has_data());
    assert!(!container.has_error());
    assert_eq!(container.state(), Some(3));
}

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------

struct Widget {
    frame: u32,
    log: Arc<Mutex<Vec<String>>>,
}

impl Observer for Widget {
    fn rebuild(&self, _: SubscriptionHandle) {
        self.log.lock().push("rebuild".into());
    }

    fn context(&self) -> Option<FrameContext> {
        Some(FrameContext::new(self.frame))
    }
}

fn frame(context: Option<&FrameContext>) -> u32 {
    context.and_then(|c| c.downcast_ref::<u32>()).copied().unwrap_or(0)
}

/// Handlers run in a fixed order around the rebuild.
#[test]
fn handlers_run_in_documented_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let global_log = log.clone();
    let container = ReactiveContainer::builder()
        .value(0)
        .config(ContainerConfig::default().with_on_data(move |ctx, value: &i32| {
            global_log.lock().push(format!("global_data:{value}:{}", frame(ctx)));
        }))
        .build()
        .expect("value container");
    container.subscribe(Widget {
        frame: 7,
        log: log.clone(),
    });

    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    container
        .set_state(
            |_| MutationOutcome::value(1),
            SetStateOptions::new()
                .on_set_state(move |ctx| l1.lock().push(format!("set_state:{}", frame(ctx))))
                .on_data(move |_, value| l2.lock().push(format!("call_data:{value}")))
                .on_rebuild_state(move |ctx| l3.lock().push(format!("rebuild_state:{}", frame(ctx)))),
        )
        .expect("set_state");

    assert_eq!(
        *log.lock(),
        vec![
            "set_state:7".to_string(),
            "global_data:1:7".to_string(),
            "call_data:1".to_string(),
            "rebuild".to_string(),
            "rebuild_state:7".to_string(),
        ]
    );
}

/// Global and call-level error handlers both run; the order is configurable.
#[test]
fn error_handlers_are_additive() {
    for (order, expected) in [
        (HandlerOrder::GlobalFirst, ["global:bad", "call:bad"]),
        (HandlerOrder::CallFirst, ["call:bad", "global:bad"]),
    ] {
        let log = Arc::new(Mutex::new(Vec::new()));
        let global_log = log.clone();
        let container = ReactiveContainer::builder()
            .value(0)
            .config(
                ContainerConfig::default()
                    .with_handler_order(order)
                    .with_on_error(move |_, err| global_log.lock().push(format!("global:{err}"))),
            )
            .build()
            .expect("value container");

        let call_log = log.clone();
        container
            .set_state(
                |_| MutationOutcome::fail("bad"),
                SetStateOptions::new()
                    .catch_error(true)
                    .on_error(move |_, err| call_log.lock().push(format!("call:{err}"))),
            )
            .expect("caught");

        assert_eq!(*log.lock(), expected.map(String::from).to_vec());
        assert_eq!(container.error().expect("stored").message(), "bad");
    }
}

/// Without observers, handlers receive no context.
#[test]
fn handlers_get_no_context_without_observers() {
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    let container = ReactiveContainer::new(0);
    container
        .set_state(
            |_| MutationOutcome::value(1),
            SetStateOptions::new().on_set_state(move |ctx| *seen_clone.lock() = Some(ctx.is_some())),
        )
        .expect("set_state");
    assert_eq!(*seen.lock(), Some(false));
}

// ----------------------------------------------------------------------------
// Futures
// ----------------------------------------------------------------------------

/// waiting right after the call, done once the future settles.
#[tokio::test]
async fn future_mutation_lifecycle() {
    init_tracing();
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);
    let (tx, rx) = oneshot::channel();

    container
        .set_state(move |_| pending_value(rx), SetStateOptions::new())
        .expect("set_state");
    assert!(container.is_waiting());
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);

    tx.send(Ok(42)).expect("receiver alive");
    assert_eq!(container.state_async().await.expect("value"), 42);
    assert_eq!(container.status(), ConnectionStatus::Done);
    assert!(container.has_data());
    assert_eq!(rebuilds.load(Ordering::SeqCst), 2);
}

/// Caught async failures land in the snapshot and reject `state_async`.
#[tokio::test]
async fn future_failure_with_catch() {
    let container = ReactiveContainer::new(0);
    let (tx, rx) = oneshot::channel();

    let completion = container
        .set_state(move |_| pending_value(rx), SetStateOptions::new().catch_error(true))
        .expect("set_state");
    tx.send(Err(MutationError::new("timeout"))).expect("receiver alive");

    let err = container.state_async().await.expect_err("should reject");
    assert_eq!(err.as_mutation().map(|e| e.message()), Some("timeout"));
    completion.wait().await.expect("caught");
    assert!(container.has_error());
    assert_eq!(container.status(), ConnectionStatus::Done);
    assert_eq!(container.state(), Some(0));
}

/// Uncaught async failures are still recorded, and surface on the completion.
#[tokio::test]
async fn future_failure_without_catch() {
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);
    let (tx, rx) = oneshot::channel();

    let completion = container
        .set_state(move |_| pending_value(rx), SetStateOptions::new())
        .expect("set_state returns before the failure");
    tx.send(Err(MutationError::new("boom"))).expect("receiver alive");

    let err = completion.wait().await.expect_err("uncaught");
    assert_eq!(err.to_string(), "boom");
    assert!(container.has_error());
    assert_eq!(rebuilds.load(Ordering::SeqCst), 2);
}

/// `set_state_async` suspends only when asked to.
#[tokio::test]
async fn should_await_controls_suspension() {
    let container = ReactiveContainer::new(0);

    container
        .set_state_async(
            |_| MutationOutcome::future(async { Ok::<_, MutationError>(1) }),
            SetStateOptions::new().should_await(true),
        )
        .await
        .expect("awaited");
    assert_eq!(container.status(), ConnectionStatus::Done);
    assert_eq!(container.state(), Some(1));

    container
        .set_state_async(
            |_| MutationOutcome::future(async { Ok::<_, MutationError>(2) }),
            SetStateOptions::new(),
        )
        .await
        .expect("scheduled");
    assert!(container.is_waiting());
    assert_eq!(container.state_async().await.expect("value"), 2);
}

/// A future producer has no mutation entry point unless configured.
#[tokio::test]
async fn future_producer_rejects_mutation() {
    let container = ReactiveContainer::builder()
        .producer(Producer::future(|| async { Ok::<_, MutationError>(3) }))
        .build()
        .expect("inside a runtime");
    assert!(container.is_waiting());

    let err = container
        .set_state(|n| MutationOutcome::value(*n + 1), SetStateOptions::new())
        .expect_err("no mutation support");
    assert!(matches!(err, StateError::InvalidOperation(_)));
    assert_eq!(container.state_async().await.expect("value"), 3);
}

#[tokio::test]
async fn future_producer_with_mutation_support() {
    let container = ReactiveContainer::builder()
        .producer(Producer::future(|| async { Ok::<_, MutationError>(3) }))
        .config(ContainerConfig::default().with_mutation_support(true))
        .build()
        .expect("inside a runtime");
    assert_eq!(container.state_async().await.expect("value"), 3);

    container
        .set_state(|n| MutationOutcome::value(*n + 1), SetStateOptions::new())
        .expect("mutable");
    assert_eq!(container.state(), Some(4));

    container.refresh().expect("refresh").wait().await.expect("settled");
    assert_eq!(container.state(), Some(3));
}

/// Lazy containers run their producer on first access only.
#[test]
fn lazy_container_defers_producer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let container = ReactiveContainer::builder()
        .factory(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            5
        })
        .config(ContainerConfig::default().with_lazy(true))
        .build()
        .expect("lazy container");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(container.state(), Some(5));
    assert_eq!(container.state(), Some(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ----------------------------------------------------------------------------
// Streams
// ----------------------------------------------------------------------------

/// Every emission commits `active`; errors keep the last value.
#[tokio::test]
async fn stream_emissions_commit_active_snapshots() {
    let container = ReactiveContainer::new(0);
    let rebuilds = counter(&container);
    let (tx, stream) = channel_stream::<i32>();

    let completion = container
        .set_state(move |_| MutationOutcome::stream(stream), SetStateOptions::new().catch_error(true))
        .expect("set_state");
    assert!(container.is_waiting());
    let mut commits = container.snapshots().expect("alive");

    tx.send(Ok(1)).expect("stream alive");
    let snapshot = next_commit(&mut commits).await;
    assert_eq!(snapshot.status(), ConnectionStatus::Active);
    assert_eq!(snapshot.data(), Some(&1));

    tx.send(Err(MutationError::new("hiccup"))).expect("stream alive");
    let snapshot = next_commit(&mut commits).await;
    assert_eq!(snapshot.status(), ConnectionStatus::Active);
    assert!(snapshot.has_error());
    assert_eq!(snapshot.data(), Some(&1));

    tx.send(Ok(2)).expect("stream alive");
    let snapshot = next_commit(&mut commits).await;
    assert!(snapshot.has_data());
    assert_eq!(snapshot.data(), Some(&2));
    assert_eq!(rebuilds.load(Ordering::SeqCst), 4);

    assert!(!container.is_stream_done());
    drop(tx);
    completion.wait().await.expect("stream finished");
    assert!(container.is_stream_done());
    assert_eq!(container.status(), ConnectionStatus::Active);
    assert_eq!(container.state(), Some(2));
}

/// An uncaught stream error is recorded, the stream keeps going, and the
/// error surfaces from the completion once the stream ends.
#[tokio::test]
async fn uncaught_stream_error_surfaces_on_completion() {
    init_tracing();
    let container = ReactiveContainer::new(0);
    let (tx, stream) = channel_stream::<i32>();

    let completion = container
        .set_state(move |_| MutationOutcome::stream(stream), SetStateOptions::new())
        .expect("set_state");
    let mut commits = container.snapshots().expect("alive");

    tx.send(Ok(1)).expect("stream alive");
    next_commit(&mut commits).await;

    tx.send(Err(MutationError::new("lost"))).expect("stream alive");
    let snapshot = next_commit(&mut commits).await;
    assert_eq!(snapshot.status(), ConnectionStatus::Active);
    assert_eq!(snapshot.error().map(|e| e.message()), Some("lost"));
    assert_eq!(snapshot.data(), Some(&1));

    tx.send(Ok(2)).expect("stream still running");
    let snapshot = next_commit(&mut commits).await;
    assert!(snapshot.has_data());
    assert_eq!(snapshot.data(), Some(&2));

    drop(tx);
    let err = completion.wait().await.expect_err("uncaught");
    assert_eq!(err.as_mutation().map(|e| e.message()), Some("lost"));
    assert!(container.is_stream_done());
    assert_eq!(container.status(), ConnectionStatus::Active);
}

/// A stream that ends without emitting does not leave the container waiting.
#[tokio::test]
async fn empty_stream_does_not_strand_waiters() {
    let container = ReactiveContainer::new(3);
    let (tx, stream) = channel_stream::<i32>();

    container
        .set_state(move |_| MutationOutcome::stream(stream), SetStateOptions::new())
        .expect("set_state");
    assert!(container.is_waiting());
    drop(tx);

    assert_eq!(container.state_async().await.expect("value"), 3);
    assert_eq!(container.status(), ConnectionStatus::Done);
    assert!(container.is_stream_done());
}

/// A failed uncaught mutation does not cancel a future already in flight.
#[tokio::test]
async fn uncaught_failure_leaves_pending_future_alone() {
    let container = ReactiveContainer::new(0);
    let (tx, rx) = oneshot::channel();

    container
        .set_state(move |_| pending_value(rx), SetStateOptions::new())
        .expect("future");
    container
        .set_state(|_| MutationOutcome::fail("boom"), SetStateOptions::new())
        .expect_err("uncaught");

    tx.send(Ok(5)).expect("receiver alive");
    assert_eq!(container.state_async().await.expect("value"), 5);
    assert_eq!(container.status(), ConnectionStatus::Done);
}

/// A newer mutation cancels the running stream.
#[tokio::test]
async fn new_mutation_cancels_stream() {
    let container = ReactiveContainer::new(0);
    let (tx, stream) = channel_stream::<i32>();

    let completion = container
        .set_state(move |_| MutationOutcome::stream(stream), SetStateOptions::new())
        .expect("stream");
    container
        .set_state(|_| MutationOutcome::value(10), SetStateOptions::new())
        .expect("sync");

    completion.wait().await.expect("cancelled quietly");
    assert!(tx.send(Ok(99)).is_err());
    assert_eq!(container.state(), Some(10));
    assert_eq!(container.status(), ConnectionStatus::Done);
}

/// Disposing cancels the stream and rejects later waiters.
#[tokio::test]
async fn dispose_cancels_stream() {
    let container = ReactiveContainer::new(0);
    let (tx, stream) = channel_stream::<i32>();

    let completion = container
        .set_state(move |_| MutationOutcome::stream(stream), SetStateOptions::new())
        .expect("stream");
    container.dispose();

    completion.wait().await.expect("cancelled quietly");
    assert!(tx.send(Ok(1)).is_err());
    assert!(matches!(container.state_async().await, Err(StateError::Disposed)));
}

/// A stream producer feeds the container from creation.
#[tokio::test]
async fn stream_producer_feeds_container() {
    let container = ReactiveContainer::builder()
        .producer(Producer::stream(|| {
            futures_util::stream::iter(vec![Ok::<_, MutationError>(1), Ok(2), Ok(3)])
        }))
        .build()
        .expect("inside a runtime");
    let mut commits = container.snapshots().expect("alive");

    loop {
        let snapshot = next_commit(&mut commits).await;
        if snapshot.data() == Some(&3) {
            break;
        }
    }
    assert!(container.is_active());
    assert!(container.has_data());
}

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

#[test]
fn registry_returns_identical_instances_per_seed() {
    let registry = InstanceRegistry::new(Producer::value(|| 0)).expect("registry");
    let a = registry.get_or_create(Some("a")).expect("a");
    assert!(a.ptr_eq(&registry.get_or_create(Some("a")).expect("a")));
    assert!(!a.ptr_eq(&registry.get_or_create(Some("b")).expect("b")));
    assert_eq!(a.seed(), Some("a"));
    assert!(registry.singleton().is_singleton());
}

/// Siblings rebuild, but keep their own snapshots.
#[test]
fn notify_all_reactive_instances_rebuilds_siblings() {
    let registry = InstanceRegistry::new(Producer::value(|| 0)).expect("registry");
    let singleton = registry.singleton();
    let a = registry.instance("a").expect("a");
    let b = registry.instance("b").expect("b");
    let (on_singleton, on_a, on_b) = (counter(&singleton), counter(&a), counter(&b));

    a.set_state(
        |_| MutationOutcome::value(1),
        SetStateOptions::new().notify_all_reactive_instances(true),
    )
    .expect("set_state");

    assert_eq!(on_a.load(Ordering::SeqCst), 1);
    assert_eq!(on_b.load(Ordering::SeqCst), 1);
    assert_eq!(on_singleton.load(Ordering::SeqCst), 1);
    assert_eq!(b.state(), Some(0));
    assert!(b.is_idle());
    assert!(singleton.is_idle());
}

/// Error beats idle; once everyone has data, the latest value wins.
#[test]
fn combined_instances_reduce_into_singleton() {
    let registry = InstanceRegistry::with_config(
        Producer::value(|| 0),
        ContainerConfig::default(),
        JoinPolicy::WithCombinedReactiveInstances,
    )
    .expect("registry");
    let singleton = registry.singleton();
    let a = registry.instance("a").expect("a");
    let b = registry.instance("b").expect("b");

    a.set_state(|_| MutationOutcome::fail("a broke"), SetStateOptions::new().catch_error(true))
        .expect("caught");
    assert!(b.is_idle());
    assert!(singleton.has_error());

    a.set_state(|_| MutationOutcome::value(1), SetStateOptions::new())
        .expect("a");
    assert!(singleton.is_idle());

    b.set_state(|_| MutationOutcome::value(2), SetStateOptions::new())
        .expect("b");
    assert!(singleton.has_data());
    assert_eq!(singleton.state(), Some(2));
}

#[tokio::test]
async fn combined_instances_wait_for_pending_instance() {
    let registry = InstanceRegistry::with_config(
        Producer::value(|| 0),
        ContainerConfig::default(),
        JoinPolicy::WithCombinedReactiveInstances,
    )
    .expect("registry");
    let singleton = registry.singleton();
    let a = registry.instance("a").expect("a");
    let b = registry.instance("b").expect("b");
    let (tx, rx) = oneshot::channel();

    a.set_state(move |_| pending_value(rx), SetStateOptions::new())
        .expect("a");
    assert!(singleton.is_waiting());

    b.set_state(|_| MutationOutcome::value(2), SetStateOptions::new())
        .expect("b");
    assert!(singleton.is_waiting());

    tx.send(Ok(1)).expect("receiver alive");
    assert_eq!(a.state_async().await.expect("a value"), 1);
    assert!(singleton.has_data());
    assert_eq!(singleton.state(), Some(1));
}

/// Joined singletons notify their own observers.
#[test]
fn join_singleton_notifies_singleton_observers() {
    let registry = InstanceRegistry::new(Producer::value(|| 0)).expect("registry");
    let singleton = registry.singleton();
    let rebuilds = counter(&singleton);
    let a = registry.instance("a").expect("a");

    a.set_state(|_| MutationOutcome::value(8), SetStateOptions::new())
        .expect("a");
    assert_eq!(rebuilds.load(Ordering::SeqCst), 0);

    a.set_state(|_| MutationOutcome::value(9), SetStateOptions::new().join_singleton(true))
        .expect("a");
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
    assert_eq!(singleton.state(), Some(9));
}

//! Observer subscriptions.
//!
//! An observer is whatever wants to be told that a container changed: in a
//! UI this is a widget that re-renders, in tests it is usually a closure that
//! bumps a counter. Observers are kept in subscription order and may carry an
//! optional [`Tag`] used for selective notification.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// Handle returned by a subscription, consumed by `unsubscribe`.
///
/// Handles are unique across the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Label attached to a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Arc<str>);

impl Tag {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag(Arc::from(name))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token supplied by the UI side (a build context, a frame id...).
///
/// The core never looks inside; it hands the token to lifecycle handlers
/// unchanged.
#[derive(Clone)]
pub struct FrameContext(Arc<dyn Any + Send + Sync>);

impl FrameContext {
    pub fn new<C>(context: C) -> Self
    where
        C: Any + Send + Sync,
    {
        Self(Arc::new(context))
    }

    pub fn downcast_ref<C: Any>(&self) -> Option<&C> {
        self.0.downcast_ref::<C>()
    }
}

impl fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FrameContext(..)")
    }
}

/// Something that rebuilds when a container notifies it.
pub trait Observer: Send + Sync + 'static {
    /// Called synchronously for every notification this subscription receives.
    fn rebuild(&self, handle: SubscriptionHandle);

    /// The frame token passed to lifecycle handlers.
    fn context(&self) -> Option<FrameContext> {
        None
    }
}

impl<F> Observer for F
where
    F: Fn(SubscriptionHandle) + Send + Sync + 'static,
{
    fn rebuild(&self, handle: SubscriptionHandle) {
        (self)(handle)
    }
}

struct Entry {
    tag: Option<Tag>,
    observer: Arc<dyn Observer>,
}

/// Ordered set of subscribed observers.
///
/// Notification iterates over a copy of the subscriber list, so an observer
/// may subscribe or unsubscribe (itself or others) from inside `rebuild`
/// without disturbing the remaining deliveries.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<IndexMap<SubscriptionHandle, Entry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>, tag: Option<Tag>) -> SubscriptionHandle {
        let handle = SubscriptionHandle::next();
        self.entries.lock().insert(handle, Entry { tag, observer });
        handle
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.entries.lock().shift_remove(&handle).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, handle: SubscriptionHandle) -> bool {
        self.entries.lock().contains_key(&handle)
    }

    /// Context of the earliest subscription that supplies one.
    pub fn first_context(&self) -> Option<FrameContext> {
        let observers: SmallVec<[Arc<dyn Observer>; 8]> = self
            .entries
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.observer))
            .collect();
        observers.iter().find_map(|observer| observer.context())
    }

    /// Notify observers in subscription order.
    ///
    /// With a non-empty `filter`, only observers whose tag is a member are
    /// notified. Returns the number of observers that were called.
    pub fn notify(&self, filter: &[Tag]) -> usize {
        let targets: SmallVec<[(SubscriptionHandle, Arc<dyn Observer>); 8]> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| {
                filter.is_empty()
                    || entry
                        .tag
                        .as_ref()
                        .is_some_and(|tag| filter.contains(tag))
            })
            .map(|(handle, entry)| (*handle, Arc::clone(&entry.observer)))
            .collect();

        let mut notified = 0;
        for (handle, observer) in targets {
            // Removed by an earlier callback in this same pass.
            if !self.contains(handle) {
                continue;
            }
            tracing::trace!(handle = handle.raw(), "rebuilding observer");
            observer.rebuild(handle);
            notified += 1;
        }
        notified
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.len())
            .finish()
    }
}

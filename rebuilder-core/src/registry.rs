//! Instance Registry
//!
//! An [`InstanceRegistry`] owns one producer and hands out containers built
//! from it: a key-less singleton, plus any number of derived instances, each
//! bound to a seed. Derived instances keep independent snapshots but can feed
//! back into the singleton according to the registry's [`JoinPolicy`].
//!
//! # Propagation
//!
//! Every container created here holds a weak reference back to the registry.
//! After a container commits a snapshot, the registry:
//!
//! 1. Joins the singleton, when the source is a derived instance and the
//!    policy (or the call's `join_singleton` option) asks for it.
//!
//! 2. Copies the snapshot onto the siblings named in the call's `seeds`.
//!
//! 3. Rebuilds the observers of every other container when the call set
//!    `notify_all_reactive_instances`.
//!
//! A container is notified at most once per propagation pass. Adopting a
//! snapshot supersedes whatever future or stream the target had in flight.

use std::fmt;
use std::iter;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::config::ContainerConfig;
use crate::error::Result;
use crate::reactive::{Producer, ReactiveContainer, SetStateOptions, Snapshot};

/// How mutations of derived instances affect the singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinPolicy {
    /// Only an explicit `join_singleton` on the call reaches the singleton.
    #[default]
    None,

    /// The singleton copies whichever derived instance committed last.
    WithNewReactiveInstance,

    /// The singleton's snapshot is reduced from all derived instances.
    WithCombinedReactiveInstances,
}

/// Hook a container calls after each commit.
pub(crate) trait Propagate<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    fn after_commit(
        &self,
        source: &ReactiveContainer<T>,
        snapshot: &Snapshot<T>,
        options: &SetStateOptions<T>,
    );
}

struct Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    producer: Producer<T>,
    config: ContainerConfig<T>,
    policy: JoinPolicy,
    singleton: ReactiveContainer<T>,
    /// Derived instances in creation order.
    instances: Mutex<IndexMap<String, ReactiveContainer<T>>>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The snapshot the singleton adopts, with `join_singleton_to_new_data`
    /// applied under every policy.
    fn joined_snapshot(&self, snapshot: &Snapshot<T>, options: &SetStateOptions<T>) -> Snapshot<T> {
        match &options.join_singleton_to_new_data {
            Some(data) => snapshot.with_data(data()),
            None => snapshot.clone(),
        }
    }

    /// Reduce the derived instances into one snapshot for the singleton.
    ///
    /// The first error in creation order wins, then any waiting instance,
    /// then, once every instance has data, the most recently resolved value.
    fn combine(&self, instances: &[ReactiveContainer<T>]) -> Snapshot<T> {
        let resolutions: Vec<(u64, Snapshot<T>)> =
            instances.iter().map(ReactiveContainer::resolution).collect();

        if let Some((_, failed)) = resolutions.iter().find(|(_, s)| s.has_error()) {
            return failed.clone();
        }

        let current = self.singleton.resolution().1.into_data();
        if resolutions.iter().any(|(_, s)| s.is_waiting()) {
            return Snapshot::waiting(current);
        }

        if !resolutions.is_empty() && resolutions.iter().all(|(_, s)| s.has_data()) {
            let latest = resolutions
                .iter()
                .max_by_key(|(resolved_at, _)| *resolved_at)
                .and_then(|(_, s)| s.data().cloned());
            if let Some(data) = latest {
                return Snapshot::done(data);
            }
        }

        Snapshot::idle(current)
    }
}

impl<T> Propagate<T> for Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn after_commit(
        &self,
        source: &ReactiveContainer<T>,
        snapshot: &Snapshot<T>,
        options: &SetStateOptions<T>,
    ) {
        let instances: Vec<(String, ReactiveContainer<T>)> = self
            .instances
            .lock()
            .iter()
            .map(|(seed, container)| (seed.clone(), container.clone()))
            .collect();
        let notify = !options.silent;
        let mut touched: SmallVec<[u64; 4]> = SmallVec::new();
        touched.push(source.id());

        if !source.is_singleton() {
            let joined = match self.policy {
                JoinPolicy::WithCombinedReactiveInstances => {
                    let derived: Vec<_> = instances.iter().map(|(_, c)| c.clone()).collect();
                    Some(self.joined_snapshot(&self.combine(&derived), options))
                }
                JoinPolicy::WithNewReactiveInstance => Some(self.joined_snapshot(snapshot, options)),
                JoinPolicy::None if options.join_singleton => Some(self.joined_snapshot(snapshot, options)),
                JoinPolicy::None => None,
            };
            if let Some(joined) = joined {
                tracing::debug!(seed = source.seed(), status = %joined.status(), "joining singleton");
                self.singleton.adopt(joined, notify);
                touched.push(self.singleton.id());
            }
        }

        for seed in &options.seeds {
            match instances.iter().find(|(key, _)| key == seed) {
                Some((_, sibling)) if !touched.contains(&sibling.id()) => {
                    sibling.adopt(snapshot.clone(), notify);
                    touched.push(sibling.id());
                }
                Some(_) => {}
                None => tracing::warn!(seed = %seed, "ignoring unknown seed"),
            }
        }

        if options.notify_all_reactive_instances && notify {
            let siblings = iter::once(&self.singleton).chain(instances.iter().map(|(_, c)| c));
            for sibling in siblings {
                if !touched.contains(&sibling.id()) {
                    sibling.notify();
                }
            }
        }
    }
}

/// Owner of a singleton container and its seeded, derived instances.
///
/// Dropping the registry disposes every container it created.
///
/// # Example
///
/// ```rust
/// use rebuilder_core::{InstanceRegistry, Producer};
///
/// let registry = InstanceRegistry::new(Producer::value(|| 0)).unwrap();
/// let a = registry.get_or_create(Some("a")).unwrap();
/// let again = registry.get_or_create(Some("a")).unwrap();
/// assert!(a.ptr_eq(&again));
/// assert!(!a.ptr_eq(&registry.singleton()));
/// ```
pub struct InstanceRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
}

impl<T> InstanceRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(producer: Producer<T>) -> Result<Self> {
        Self::with_config(producer, ContainerConfig::default(), JoinPolicy::None)
    }

    /// Fails only when an eager future or stream singleton has no runtime.
    pub fn with_config(producer: Producer<T>, config: ContainerConfig<T>, policy: JoinPolicy) -> Result<Self> {
        let singleton = ReactiveContainer::from_parts(producer.clone(), config.clone(), None);
        let shared = Arc::new(Shared {
            producer,
            config,
            policy,
            singleton,
            instances: Mutex::new(IndexMap::new()),
        });
        let registry = Self { shared };
        registry.shared.singleton.attach_registry(registry.weak());
        if !registry.shared.config.lazy() {
            registry.shared.singleton.ensure_initialized()?;
        }
        Ok(registry)
    }

    fn weak(&self) -> Weak<dyn Propagate<T>> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        weak
    }

    pub fn policy(&self) -> JoinPolicy {
        self.shared.policy
    }

    pub fn singleton(&self) -> ReactiveContainer<T> {
        self.shared.singleton.clone()
    }

    /// The singleton for `None`, otherwise the instance bound to `seed`,
    /// created on first request.
    pub fn get_or_create(&self, seed: Option<&str>) -> Result<ReactiveContainer<T>> {
        let Some(seed) = seed else {
            return Ok(self.singleton());
        };

        let created = {
            let mut instances = self.shared.instances.lock();
            if let Some(existing) = instances.get(seed) {
                return Ok(existing.clone());
            }
            let container = ReactiveContainer::from_parts(
                self.shared.producer.clone(),
                self.shared.config.clone(),
                Some(seed.to_owned()),
            );
            container.attach_registry(self.weak());
            instances.insert(seed.to_owned(), container.clone());
            container
        };
        tracing::debug!(seed, "created reactive instance");

        if !self.shared.config.lazy() {
            if let Err(e) = created.ensure_initialized() {
                self.remove(seed);
                return Err(e);
            }
        }
        Ok(created)
    }

    /// Shorthand for `get_or_create(Some(seed))`.
    pub fn instance(&self, seed: &str) -> Result<ReactiveContainer<T>> {
        self.get_or_create(Some(seed))
    }

    /// An existing derived instance, without creating one.
    pub fn get(&self, seed: &str) -> Option<ReactiveContainer<T>> {
        self.shared.instances.lock().get(seed).cloned()
    }

    /// Number of derived instances.
    pub fn len(&self) -> usize {
        self.shared.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.instances.lock().is_empty()
    }

    /// Seeds in creation order.
    pub fn seeds(&self) -> Vec<String> {
        self.shared.instances.lock().keys().cloned().collect()
    }

    /// Dispose and forget a derived instance.
    pub fn remove(&self, seed: &str) -> bool {
        let removed = self.shared.instances.lock().shift_remove(seed);
        match removed {
            Some(container) => {
                container.dispose();
                true
            }
            None => false,
        }
    }

    /// Dispose the singleton and every derived instance.
    pub fn dispose(&self) {
        let instances: Vec<_> = self.shared.instances.lock().drain(..).map(|(_, c)| c).collect();
        for container in instances {
            container.dispose();
        }
        self.shared.singleton.dispose();
    }
}

impl<T> Drop for InstanceRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for InstanceRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("policy", &self.shared.policy)
            .field("seeds", &self.seeds())
            .finish()
    }
}

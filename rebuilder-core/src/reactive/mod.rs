//! Reactive Containers
//!
//! This module implements the state container and everything it is built
//! from: connection status, snapshots, observers, producers and the options
//! accepted by `set_state`.
//!
//! # Concepts
//!
//! ## Containers
//!
//! A [`ReactiveContainer`] holds a value and the [`Snapshot`] of the latest
//! operation on it. All mutation goes through `set_state`, which commits a
//! new snapshot for every step and notifies observers.
//!
//! ## Status
//!
//! [`ConnectionStatus`] moves `none -> done` for synchronous mutations,
//! `waiting -> done` for futures, and `waiting -> active -> active...` for
//! streams. An error never changes the status; it is recorded next to it.
//!
//! ## Observers
//!
//! An [`Observer`] is told to rebuild whenever a commit is not suppressed by
//! `silent` or by an unchanged `watch` key. Observers can be tagged so that a
//! mutation only reaches part of them.
//!
//! # Threading
//!
//! Containers are `Send + Sync` and can be shared across tasks, but the model
//! is cooperative: asynchronous work is spawned onto the current tokio
//! runtime and completions are committed in order per container.

mod status;
mod snapshot;
mod subscriber;
mod mutation;
mod handlers;
mod options;
mod container;

pub use status::ConnectionStatus;
pub use snapshot::Snapshot;
pub use subscriber::{FrameContext, Observer, ObserverRegistry, SubscriptionHandle, Tag};
pub use mutation::{MutationOutcome, Producer};
pub use handlers::{ContextHandler, DataHandler, ErrorHandler, HandlerOrder, HandlerRecord};
pub use options::{SetStateOptions, WatchKey};
pub use container::{Completion, ContainerBuilder, ReactiveContainer};

//! Rebuilder Core
//!
//! This crate provides reactive state containers for UI code. It implements:
//!
//! - Containers wrapping a value with a connection status (idle, waiting,
//!   active, done) and an error slot
//! - A single `set_state` entry point for synchronous, future-based and
//!   stream-based mutations
//! - Observer notification with tag filtering, watch keys and silent updates
//! - A registry of seeded instances sharing one producer, with join policies
//!   feeding back into a singleton
//!
//! Rendering is out of scope: a UI layer plugs in through the [`Observer`]
//! trait and re-renders when `rebuild` is called.
//!
//! # Architecture
//!
//! - `reactive`: containers, snapshots, observers and mutation options
//! - `registry`: singleton and derived instances, join policies
//! - `config`: container-level configuration and global handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use rebuilder_core::{MutationOutcome, ReactiveContainer, SetStateOptions};
//!
//! let user = ReactiveContainer::new(None::<String>);
//!
//! user.subscribe(|_| println!("rebuild"));
//!
//! // Starts in `waiting`, moves to `done` when the future resolves.
//! user.set_state(
//!     |_| MutationOutcome::future(async { fetch_user().await.map(Some) }),
//!     SetStateOptions::new().catch_error(true),
//! )?;
//!
//! let name = user.state_async().await?;
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod registry;

pub use config::ContainerConfig;
pub use error::{MutationError, Result, StateError};
pub use reactive::{
    Completion, ConnectionStatus, ContainerBuilder, FrameContext, HandlerOrder, MutationOutcome,
    Observer, Producer, ReactiveContainer, SetStateOptions, Snapshot, SubscriptionHandle, Tag,
};
pub use registry::{InstanceRegistry, JoinPolicy};

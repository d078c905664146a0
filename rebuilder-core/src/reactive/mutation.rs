//! Producers and mutation outcomes.
//!
//! A container is created from a [`Producer`]: a plain value factory, a
//! future factory or a stream factory. A mutation passed to `set_state`
//! returns a [`MutationOutcome`], which is classified exactly once, when the
//! mutation returns, into one of the three execution paths.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, Stream, StreamExt};

use crate::error::MutationError;

type ValueFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;
type FutureFactory<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, MutationError>> + Send + Sync>;
type StreamFactory<T> =
    Arc<dyn Fn() -> BoxStream<'static, Result<T, MutationError>> + Send + Sync>;

/// The factory a container (and every derived instance of it) is built from.
pub enum Producer<T> {
    Value(ValueFactory<T>),
    Future(FutureFactory<T>),
    Stream(StreamFactory<T>),
}

impl<T> Producer<T>
where
    T: Send + 'static,
{
    pub fn value<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Producer::Value(Arc::new(factory))
    }

    pub fn future<F, Fut, E>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<MutationError>,
    {
        Producer::Future(Arc::new(move || {
            factory().map(|result| result.map_err(Into::into)).boxed()
        }))
    }

    pub fn stream<F, S, E>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<MutationError>,
    {
        Producer::Stream(Arc::new(move || {
            factory().map(|item| item.map_err(Into::into)).boxed()
        }))
    }

    /// Value producers always accept mutations; async producers only when
    /// the container declares mutation support.
    pub(crate) fn is_value(&self) -> bool {
        matches!(self, Producer::Value(_))
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        match self {
            Producer::Value(f) => Producer::Value(Arc::clone(f)),
            Producer::Future(f) => Producer::Future(Arc::clone(f)),
            Producer::Stream(f) => Producer::Stream(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Producer::Value(_) => "Value",
            Producer::Future(_) => "Future",
            Producer::Stream(_) => "Stream",
        };
        write!(f, "Producer::{kind}")
    }
}

/// What a mutation hands back to the container.
pub enum MutationOutcome<T> {
    /// The mutation edited the working copy in place; commit it as is.
    InPlace,

    /// A value (or failure) that is available right now.
    Sync(Result<T, MutationError>),

    /// A single value that will be available later.
    Async(BoxFuture<'static, Result<T, MutationError>>),

    /// Any number of values over time.
    Streaming(BoxStream<'static, Result<T, MutationError>>),
}

impl<T> MutationOutcome<T>
where
    T: Send + 'static,
{
    pub fn in_place() -> Self {
        MutationOutcome::InPlace
    }

    pub fn value(value: T) -> Self {
        MutationOutcome::Sync(Ok(value))
    }

    pub fn fail(error: impl Into<MutationError>) -> Self {
        MutationOutcome::Sync(Err(error.into()))
    }

    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        E: Into<MutationError>,
    {
        MutationOutcome::Sync(result.map_err(Into::into))
    }

    pub fn future<Fut, E>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<MutationError>,
    {
        MutationOutcome::Async(future.map(|result| result.map_err(Into::into)).boxed())
    }

    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<MutationError>,
    {
        MutationOutcome::Streaming(stream.map(|item| item.map_err(Into::into)).boxed())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MutationOutcome::InPlace | MutationOutcome::Sync(_) => "sync",
            MutationOutcome::Async(_) => "async",
            MutationOutcome::Streaming(_) => "stream",
        }
    }
}

impl<T> fmt::Debug for MutationOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOutcome::InPlace => f.write_str("InPlace"),
            MutationOutcome::Sync(r) => write!(f, "Sync(ok={})", r.is_ok()),
            MutationOutcome::Async(_) => f.write_str("Async(..)"),
            MutationOutcome::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

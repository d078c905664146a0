//! Lifecycle handler records.
//!
//! Handlers live in two places: on the container (global) and on a single
//! `set_state` call. Both are plain lists of [`HandlerRecord`]s. When a
//! mutation step commits, the container walks both lists in the order given
//! by [`HandlerOrder`] and invokes every record matching the event, so a
//! call-level handler never hides a global one.

use std::fmt;
use std::sync::Arc;

use super::FrameContext;
use crate::error::MutationError;

pub type ContextHandler = Arc<dyn Fn(Option<&FrameContext>) + Send + Sync>;
pub type DataHandler<T> = Arc<dyn Fn(Option<&FrameContext>, &T) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(Option<&FrameContext>, &MutationError) + Send + Sync>;

/// One registered handler.
pub enum HandlerRecord<T> {
    /// After the new snapshot is committed, before observers rebuild.
    SetState(ContextHandler),
    /// After observers rebuilt.
    RebuildState(ContextHandler),
    /// A step produced data.
    Data(DataHandler<T>),
    /// A step failed.
    Error(ErrorHandler),
}

impl<T> Clone for HandlerRecord<T> {
    fn clone(&self) -> Self {
        match self {
            HandlerRecord::SetState(h) => HandlerRecord::SetState(Arc::clone(h)),
            HandlerRecord::RebuildState(h) => HandlerRecord::RebuildState(Arc::clone(h)),
            HandlerRecord::Data(h) => HandlerRecord::Data(Arc::clone(h)),
            HandlerRecord::Error(h) => HandlerRecord::Error(Arc::clone(h)),
        }
    }
}

impl<T> fmt::Debug for HandlerRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            HandlerRecord::SetState(_) => "SetState",
            HandlerRecord::RebuildState(_) => "RebuildState",
            HandlerRecord::Data(_) => "Data",
            HandlerRecord::Error(_) => "Error",
        };
        write!(f, "HandlerRecord::{kind}")
    }
}

/// Which list runs first when both have a handler for the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HandlerOrder {
    #[default]
    GlobalFirst,
    CallFirst,
}

/// Events a committed step can dispatch.
pub(crate) enum HandlerEvent<'a, T> {
    SetState,
    RebuildState,
    Data(&'a T),
    Error(&'a MutationError),
}

/// Borrowed view over the global and call-level lists.
pub(crate) struct Dispatcher<'a, T> {
    pub(crate) global: &'a [HandlerRecord<T>],
    pub(crate) call: &'a [HandlerRecord<T>],
    pub(crate) order: HandlerOrder,
}

impl<'a, T> Dispatcher<'a, T> {
    /// Invoke every record matching `event`. Returns how many ran.
    pub(crate) fn dispatch(&self, context: Option<&FrameContext>, event: HandlerEvent<'_, T>) -> usize {
        let (first, second) = match self.order {
            HandlerOrder::GlobalFirst => (self.global, self.call),
            HandlerOrder::CallFirst => (self.call, self.global),
        };

        let mut ran = 0;
        for record in first.iter().chain(second.iter()) {
            let matched = match (record, &event) {
                (HandlerRecord::SetState(h), HandlerEvent::SetState) => {
                    h(context);
                    true
                }
                (HandlerRecord::RebuildState(h), HandlerEvent::RebuildState) => {
                    h(context);
                    true
                }
                (HandlerRecord::Data(h), HandlerEvent::Data(value)) => {
                    h(context, value);
                    true
                }
                (HandlerRecord::Error(h), HandlerEvent::Error(error)) => {
                    h(context, error);
                    true
                }
                _ => false,
            };
            if matched {
                ran += 1;
            }
        }
        ran
    }
}

//! Immutable point-in-time view of a container.
//!
//! A container never edits its snapshot in place. Every step of a mutation
//! builds a new [`Snapshot`] and swaps it in, which is what lets readers
//! (including `state_async` waiters on another task) hold a consistent copy.

use super::ConnectionStatus;
use crate::error::MutationError;

/// `{status, data, error}` for one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    status: ConnectionStatus,
    data: Option<T>,
    error: Option<MutationError>,
}

impl<T> Snapshot<T> {
    /// Idle snapshot; `data` is whatever the producer created, if anything.
    pub fn idle(data: Option<T>) -> Self {
        Self {
            status: ConnectionStatus::None,
            data,
            error: None,
        }
    }

    /// An operation is in flight. The previous data is retained.
    pub fn waiting(data: Option<T>) -> Self {
        Self {
            status: ConnectionStatus::Waiting,
            data,
            error: None,
        }
    }

    pub fn active(data: T) -> Self {
        Self {
            status: ConnectionStatus::Active,
            data: Some(data),
            error: None,
        }
    }

    pub fn done(data: T) -> Self {
        Self {
            status: ConnectionStatus::Done,
            data: Some(data),
            error: None,
        }
    }

    /// A failed step. The last good data is kept alongside the error.
    pub fn failed(status: ConnectionStatus, data: Option<T>, error: MutationError) -> Self {
        Self {
            status,
            data,
            error: Some(error),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error(&self) -> Option<&MutationError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Data is usable: status is active or done and no error is recorded.
    pub fn has_data(&self) -> bool {
        self.status.carries_data() && self.error.is_none()
    }

    pub fn is_waiting(&self) -> bool {
        self.status == ConnectionStatus::Waiting
    }

    pub fn is_idle(&self) -> bool {
        self.status == ConnectionStatus::None
    }

    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }

    /// Same data, different status, error cleared.
    pub(crate) fn with_status(&self, status: ConnectionStatus) -> Self
    where
        T: Clone,
    {
        Self {
            status,
            data: self.data.clone(),
            error: None,
        }
    }

    /// Same status and error, data replaced.
    pub(crate) fn with_data(&self, data: T) -> Self {
        Self {
            status: self.status,
            data: Some(data),
            error: self.error.clone(),
        }
    }
}

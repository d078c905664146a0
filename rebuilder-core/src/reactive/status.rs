//! Connection status of a container's latest operation.

use std::fmt;

/// Lifecycle phase of the most recent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConnectionStatus {
    /// Never mutated, or explicitly reset to idle.
    #[default]
    None,

    /// An asynchronous operation is in flight.
    Waiting,

    /// A stream has emitted and may emit again.
    Active,

    /// A terminal value (or error) is available.
    Done,
}

impl ConnectionStatus {
    /// Whether a snapshot in this status can carry usable data.
    pub fn carries_data(self) -> bool {
        matches!(self, ConnectionStatus::Active | ConnectionStatus::Done)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::None => "none",
            ConnectionStatus::Waiting => "waiting",
            ConnectionStatus::Active => "active",
            ConnectionStatus::Done => "done",
        };
        f.write_str(name)
    }
}

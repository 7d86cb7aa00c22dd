//! Error types for the host side of the bridge.

use std::fmt;
use std::time::Duration;

use bridge_proto::Command;
use thiserror::Error;

/// Failure of a single USB control transfer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device not found: VID={vid:04X} PID={pid:04X}")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("Control transfer failed: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),

    #[error("Device disconnected")]
    Disconnected,
}

/// Engine operation that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Flush,
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Flush => f.write_str("flush"),
            Operation::Read => f.write_str("read"),
        }
    }
}

/// Errors reported by [`TransferEngine`](crate::TransferEngine).
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{command} transfer failed: {source}")]
    Transport {
        command: Command,
        #[source]
        source: TransportError,
    },

    #[error("{operation} timed out after {budget:?}")]
    Timeout { operation: Operation, budget: Duration },

    #[error("Outbound buffer full: {requested} bytes requested, {available} available")]
    CapacityExceeded { requested: usize, available: usize },

    #[error("Device accepted {accepted} of {expected} bytes")]
    ShortTransfer { accepted: usize, expected: usize },
}

impl TransferError {
    pub(crate) fn transport(command: Command) -> impl FnOnce(TransportError) -> Self {
        move |source| TransferError::Transport { command, source }
    }

    /// `true` for [`TransferError::Timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }
}

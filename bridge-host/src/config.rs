//! Timing and policy knobs of the transfer engine.

use std::time::Duration;

/// What to do when the device accepts fewer bytes than a chunk carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortTransferPolicy {
    /// Log a warning and move on to the next chunk.
    #[default]
    Warn,
    /// Abort the flush with [`TransferError::ShortTransfer`](crate::TransferError::ShortTransfer).
    Fail,
}

/// Engine timing.
///
/// The defaults match the bridge firmware's UART pacing: one 32-byte chunk
/// at 115 200 baud drains in under 3 ms, so polling starts after 2 ms and
/// continues every millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline used by [`TransferEngine::flush_all`](crate::TransferEngine::flush_all).
    pub flush_timeout: Duration,
    /// Wait before the first progress query after a chunk.
    pub poll_initial_delay: Duration,
    /// Interval between progress queries.
    pub poll_step: Duration,
    /// Fixed charge against the flush deadline per chunk transfer.
    pub chunk_cost: Duration,
    /// Wait before the first read after a flush.
    pub read_settle: Duration,
    /// Charge against the read duration for a non-empty response, also slept.
    pub data_read_cost: Duration,
    /// Charge against the read duration for an empty response.
    pub empty_read_cost: Duration,
    /// Sleep after an empty response.
    pub empty_read_backoff: Duration,
    /// Wait after a baud change for the device to reprogram its UART.
    pub baud_settle: Duration,
    pub short_transfers: ShortTransferPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_timeout: Duration::from_secs(5),
            poll_initial_delay: Duration::from_millis(2),
            poll_step: Duration::from_millis(1),
            chunk_cost: Duration::from_micros(100),
            read_settle: Duration::from_millis(7),
            data_read_cost: Duration::from_micros(400),
            empty_read_cost: Duration::from_micros(500),
            empty_read_backoff: Duration::from_micros(1500),
            baud_settle: Duration::from_millis(40),
            short_transfers: ShortTransferPolicy::Warn,
        }
    }
}

impl EngineConfig {
    /// Set the deadline used by `flush_all`.
    #[must_use]
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_short_transfers(mut self, policy: ShortTransferPolicy) -> Self {
        self.short_transfers = policy;
        self
    }
}

//! Single-slot command mailbox between the USB handler and the main loop.
//!
//! Posting overwrites any command the main loop has not picked up yet.
//! There is no queue: if two commands arrive before the main loop looks,
//! only the later one runs.

use bridge_proto::{BaudRate, GpioPattern};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Work handed to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingCommand {
    /// Transmit the write stage.
    WriteUart,
    /// Apply a strapping pattern.
    SetGpio(GpioPattern),
    /// Flush the receive ring and reprogram the UART.
    SetBaudRate(BaudRate),
}

/// Latest-value-wins command slot.
pub struct Mailbox {
    slot: Signal<CriticalSectionRawMutex, PendingCommand>,
}

impl Mailbox {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    /// Post a command, replacing any command still pending.
    pub fn post(&self, command: PendingCommand) {
        self.slot.signal(command);
    }

    /// Read and clear the slot.
    pub fn take(&self) -> Option<PendingCommand> {
        self.slot.try_take()
    }

    /// Wait until a command is posted, then read and clear the slot.
    pub async fn wait(&self) -> PendingCommand {
        self.slot.wait().await
    }

    /// Whether a command is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

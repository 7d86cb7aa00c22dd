//! State shared between the USB handler, the UART receive path and the main
//! loop.
//!
//! The USB handler and the receive path run at interrupt priority and
//! preempt the main loop. Everything here is reachable through `&self` so a
//! single [`LinkState`] can live in a `static`.

use core::cell::RefCell;

use bridge_proto::{Direction, GpioPattern, Progress, Request, MAX_PACKET_LEN};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::dispatcher::DispatchState;
use crate::error::DeviceError;
use crate::mailbox::{Mailbox, PendingCommand};
use crate::ring::ReceiveRing;
use crate::stage::{Chunk, WriteStage};

/// What the USB handler must do after an accepted control OUT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutOutcome {
    /// Request recorded; acknowledge the status stage.
    Accepted,
    /// `SetGpio 0` recorded. The platform layer drives the reset line low
    /// right away, ahead of the main loop applying the full pattern.
    AssertReset,
    /// The host asked the bridge to reboot into its own bootloader.
    /// The platform layer performs the jump.
    JumpToBootloader,
}

/// Mailbox, receive ring, write stage and progress flag of one bridge.
pub struct LinkState {
    mailbox: Mailbox,
    ring: Mutex<CriticalSectionRawMutex, RefCell<ReceiveRing>>,
    stage: Mutex<CriticalSectionRawMutex, RefCell<WriteStage>>,
    busy: AtomicBool,
    state: AtomicU8,
}

impl LinkState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mailbox: Mailbox::new(),
            ring: Mutex::new(RefCell::new(ReceiveRing::new())),
            stage: Mutex::new(RefCell::new(WriteStage::new())),
            busy: AtomicBool::new(false),
            state: AtomicU8::new(DispatchState::Idle.to_raw()),
        }
    }

    /// Handle a control IN request (device to host).
    ///
    /// Writes the response into `buf` and returns its length.
    pub fn control_in(&self, request: Request, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let limit = buf.len().min(MAX_PACKET_LEN);
        let buf = &mut buf[..limit];
        match request {
            Request::GetProgress => {
                let slot = buf.first_mut().ok_or(DeviceError::ResponseBufferTooSmall)?;
                *slot = self.progress().to_byte();
                Ok(1)
            }
            Request::ReadUart => Ok(self.ring.lock(|ring| ring.borrow_mut().drain_into(buf))),
            other => Err(DeviceError::WrongDirection(other.command())),
        }
    }

    /// Handle a control OUT request (host to device) together with its data
    /// stage.
    ///
    /// Never blocks: the actual work is posted to the mailbox for the main
    /// loop.
    pub fn control_out(&self, request: Request, data: &[u8]) -> Result<OutOutcome, DeviceError> {
        if request.direction() != Direction::Out {
            return Err(DeviceError::WrongDirection(request.command()));
        }
        match request {
            Request::WriteUart => {
                self.stage.lock(|stage| stage.borrow_mut().load(data))?;
                self.busy.store(true, Ordering::Release);
                self.mailbox.post(PendingCommand::WriteUart);
            }
            Request::SetGpio(pattern) => {
                self.mailbox.post(PendingCommand::SetGpio(pattern));
                if pattern == GpioPattern::ALL_LOW {
                    return Ok(OutOutcome::AssertReset);
                }
            }
            Request::SetBaudRate(rate) => self.mailbox.post(PendingCommand::SetBaudRate(rate)),
            Request::JumpToBootloader => return Ok(OutOutcome::JumpToBootloader),
            Request::GetProgress | Request::ReadUart => {
                return Err(DeviceError::WrongDirection(request.command()))
            }
        }
        Ok(OutOutcome::Accepted)
    }

    /// Decode `bRequest`/`wValue` of a raw setup packet.
    pub fn decode(opcode: u8, value: u16) -> Result<Request, DeviceError> {
        Ok(Request::decode(opcode, value)?)
    }

    /// Record one byte from the UART receive path.
    pub fn uart_received(&self, byte: u8) {
        self.ring.lock(|ring| {
            ring.borrow_mut().push(byte);
        });
    }

    /// Record a burst of bytes from the UART receive path.
    pub fn uart_received_all(&self, bytes: &[u8]) {
        self.ring.lock(|ring| {
            let mut ring = ring.borrow_mut();
            for &b in bytes {
                ring.push(b);
            }
        });
    }

    /// Current busy/idle flag.
    #[must_use]
    pub fn progress(&self) -> Progress {
        if self.busy.load(Ordering::Acquire) {
            Progress::Busy
        } else {
            Progress::Idle
        }
    }

    /// What the main loop is executing right now.
    #[must_use]
    pub fn dispatch_state(&self) -> DispatchState {
        DispatchState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Number of received bytes lost to ring overwrite.
    #[must_use]
    pub fn overwritten(&self) -> u32 {
        self.ring.lock(|ring| ring.borrow().overwritten())
    }

    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub(crate) fn take_chunk(&self) -> Chunk {
        self.stage.lock(|stage| stage.borrow_mut().take())
    }

    pub(crate) fn set_dispatch_state(&self, state: DispatchState) {
        self.state.store(state.to_raw(), Ordering::Release);
    }

    pub(crate) fn set_idle(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub(crate) fn discard_received(&self) {
        self.ring.lock(|ring| ring.borrow_mut().clear());
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

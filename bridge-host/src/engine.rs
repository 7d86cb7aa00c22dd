//! Host transfer engine: buffered UART writes and polled reads over vendor
//! control transfers.
//!
//! The bridge can only move [`MAX_PACKET_LEN`] bytes per transfer and never
//! notifies the host, so the engine paces itself:
//!
//! - **write** only buffers. **flush** sends the buffer chunk by chunk and
//!   polls `GetProgress` after each chunk until the device has drained it
//!   to its UART.
//! - **read** pulls whole ring snapshots into a local staging buffer and
//!   serves the caller from there, backing off while the device has nothing.
//!
//! All waiting goes through a [`Clock`], so tests run without real delays.

use std::time::Duration;

use bridge_proto::{BaudRate, Command, Progress, Request, MAX_PACKET_LEN};
use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, ShortTransferPolicy};
use crate::error::{Operation, TransferError, TransportError};
use crate::stats::WriteStats;
use crate::strap::{StrapStep, ENTER_BOOT, RESET};
use crate::transport::ControlTransport;

/// Capacity of the outbound buffer.
pub const OUTBOUND_CAPACITY: usize = 4 * 1024;

/// Smallest polling budget. A deadline already spent still gets one query.
const MIN_BUDGET: Duration = Duration::from_micros(1);

/// Most recent `ReadUart` response and how much of it the caller consumed.
struct InboundStaging {
    buf: [u8; MAX_PACKET_LEN],
    len: usize,
    pos: usize,
}

impl InboundStaging {
    const fn new() -> Self {
        Self {
            buf: [0; MAX_PACKET_LEN],
            len: 0,
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.len - self.pos
    }

    fn take_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.remaining().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Replace the exhausted contents with a fresh device snapshot.
    fn refill<T: ControlTransport>(&mut self, transport: &mut T) -> Result<usize, TransportError> {
        let n = transport
            .control_in(Request::ReadUart, &mut self.buf)?
            .min(MAX_PACKET_LEN);
        self.len = n;
        self.pos = 0;
        Ok(n)
    }
}

/// Buffered, paced access to one bridge.
///
/// Operations are blocking and must not overlap; the engine is used from a
/// single thread.
pub struct TransferEngine<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: EngineConfig,
    outbound: Vec<u8>,
    staging: InboundStaging,
    read_delay: bool,
    stats: WriteStats,
}

impl<T: ControlTransport> TransferEngine<T> {
    /// Create an engine with default timing that really sleeps.
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock, EngineConfig::default())
    }

    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self::with_clock(transport, SystemClock, config)
    }
}

impl<T: ControlTransport, C: Clock> TransferEngine<T, C> {
    pub fn with_clock(transport: T, clock: C, config: EngineConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            outbound: Vec::with_capacity(OUTBOUND_CAPACITY),
            staging: InboundStaging::new(),
            read_delay: false,
            stats: WriteStats::new(),
        }
    }

    /// Append `bytes` to the outbound buffer. Nothing is sent.
    ///
    /// Fails with [`TransferError::CapacityExceeded`] and appends nothing if
    /// the buffer cannot take all of `bytes`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        let available = OUTBOUND_CAPACITY - self.outbound.len();
        if bytes.len() > available {
            return Err(TransferError::CapacityExceeded {
                requested: bytes.len(),
                available,
            });
        }
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }

    /// Send the outbound buffer, waiting for the device to drain each chunk.
    ///
    /// The buffer is cleared up front, so bytes are not resent after an
    /// error. Returns the number of bytes flushed. The next read waits
    /// [`EngineConfig::read_settle`] first.
    pub fn flush(&mut self, timeout: Duration) -> Result<usize, TransferError> {
        let data = std::mem::replace(&mut self.outbound, Vec::with_capacity(OUTBOUND_CAPACITY));
        self.read_delay = true;
        if data.is_empty() {
            return Ok(0);
        }

        debug!("Flushing {} bytes", data.len());
        let mut remaining = timeout;
        for chunk in data.chunks(MAX_PACKET_LEN) {
            let accepted = self
                .transport
                .control_out(Request::WriteUart, chunk)
                .map_err(TransferError::transport(Command::WriteUart))?;
            self.stats.record(accepted);

            if accepted < chunk.len() {
                warn!(
                    "Short write: device accepted {} of {} bytes",
                    accepted,
                    chunk.len()
                );
                if self.config.short_transfers == ShortTransferPolicy::Fail {
                    return Err(TransferError::ShortTransfer {
                        accepted,
                        expected: chunk.len(),
                    });
                }
            }

            remaining = remaining.saturating_sub(self.config.chunk_cost);
            remaining = self.poll_until_idle(
                self.config.poll_initial_delay,
                self.config.poll_step,
                remaining,
            )?;
            if remaining.is_zero() {
                return Err(TransferError::Timeout {
                    operation: Operation::Flush,
                    budget: timeout,
                });
            }
        }
        Ok(data.len())
    }

    /// [`flush`](Self::flush) with [`EngineConfig::flush_timeout`].
    pub fn flush_all(&mut self) -> Result<usize, TransferError> {
        self.flush(self.config.flush_timeout)
    }

    /// Wait `initial_delay`, then query progress every `step` until the
    /// device is idle.
    ///
    /// Returns the unused part of `timeout`, or zero if the device was still
    /// busy when it ran out.
    pub fn poll_until_idle(
        &mut self,
        initial_delay: Duration,
        step: Duration,
        timeout: Duration,
    ) -> Result<Duration, TransferError> {
        let step = step.max(MIN_BUDGET);
        self.clock.sleep(initial_delay);
        let mut remaining = timeout.checked_sub(initial_delay).unwrap_or(MIN_BUDGET);

        while !remaining.is_zero() {
            if self.query_progress()?.is_idle() {
                return Ok(remaining);
            }
            remaining = remaining.saturating_sub(step);
            if !remaining.is_zero() {
                self.clock.sleep(step);
            }
        }
        Ok(Duration::ZERO)
    }

    fn query_progress(&mut self) -> Result<Progress, TransferError> {
        let mut byte = [0u8; 1];
        let n = self
            .transport
            .control_in(Request::GetProgress, &mut byte)
            .map_err(TransferError::transport(Command::GetProgress))?;
        if n == 0 {
            warn!("Empty progress response, assuming idle");
        }
        Ok(Progress::from_byte(byte[0]))
    }

    fn settle_after_flush(&mut self) {
        if self.read_delay {
            self.read_delay = false;
            self.clock.sleep(self.config.read_settle);
        }
    }

    /// Fill `buf` completely within `duration`.
    ///
    /// Bytes left over from an earlier transfer are used first. If the
    /// device does not deliver enough in time the call fails with
    /// [`TransferError::Timeout`] and whatever arrived is lost.
    pub fn read(&mut self, buf: &mut [u8], duration: Duration) -> Result<(), TransferError> {
        self.settle_after_flush();

        let mut filled = self.staging.take_into(buf);
        let mut spent = Duration::ZERO;
        let mut transfers = 0u32;
        let mut empty = 0u32;

        while filled < buf.len() {
            if spent >= duration {
                debug!(
                    "Read timed out with {}/{} bytes after {} transfers ({} empty)",
                    filled,
                    buf.len(),
                    transfers,
                    empty
                );
                return Err(TransferError::Timeout {
                    operation: Operation::Read,
                    budget: duration,
                });
            }

            transfers += 1;
            let n = self
                .staging
                .refill(&mut self.transport)
                .map_err(TransferError::transport(Command::ReadUart))?;

            if n > 0 {
                filled += self.staging.take_into(&mut buf[filled..]);
                if filled == buf.len() {
                    break;
                }
                self.clock.sleep(self.config.data_read_cost);
                spent += self.config.data_read_cost;
            } else {
                empty += 1;
                spent += self.config.empty_read_cost;
                self.clock.sleep(self.config.empty_read_backoff);
            }
        }

        debug!(
            "Read {} bytes in {} transfers ({} empty)",
            buf.len(),
            transfers,
            empty
        );
        Ok(())
    }

    /// Copy out whatever is available without waiting for more.
    ///
    /// Uses staged bytes if there are any, otherwise issues one `ReadUart`.
    /// Returns zero when the device had nothing.
    pub fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransferError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.settle_after_flush();
        if self.staging.remaining() == 0 {
            self.staging
                .refill(&mut self.transport)
                .map_err(TransferError::transport(Command::ReadUart))?;
        }
        Ok(self.staging.take_into(buf))
    }

    /// Strap the target into its serial download mode.
    pub fn enter_boot_mode(&mut self) -> Result<(), TransferError> {
        info!("Entering boot mode");
        self.run_strap(&ENTER_BOOT)
    }

    /// Reset the target into normal boot.
    pub fn reset_target(&mut self) -> Result<(), TransferError> {
        info!("Resetting target");
        self.run_strap(&RESET)
    }

    fn run_strap(&mut self, steps: &[StrapStep]) -> Result<(), TransferError> {
        for step in steps {
            debug!("GPIO {}", step.pattern);
            self.transport
                .control_out(Request::SetGpio(step.pattern), &[])
                .map_err(TransferError::transport(Command::SetGpio))?;
            if !step.hold.is_zero() {
                self.clock.sleep(step.hold);
            }
        }
        Ok(())
    }

    /// Switch the bridge UART to `rate`.
    ///
    /// 74 880 selects the ROM rate; every other value selects 115 200.
    /// Returns the rate actually selected.
    pub fn set_baud_rate(&mut self, rate: u32) -> Result<BaudRate, TransferError> {
        let selected = BaudRate::from_rate(rate);
        if selected.bits_per_second() != rate {
            warn!("{} baud is not supported, using {}", rate, selected);
        }
        info!("Setting baud rate to {}", selected);

        self.transport
            .control_out(Request::SetBaudRate(selected), &[])
            .map_err(TransferError::transport(Command::SetBaudRate))?;
        self.clock.sleep(self.config.baud_settle);
        Ok(selected)
    }

    /// Reboot the bridge itself into its USB bootloader.
    ///
    /// The device disappears from the bus; the engine is useless afterwards.
    pub fn jump_to_bootloader(&mut self) -> Result<(), TransferError> {
        info!("Rebooting bridge into its bootloader");
        self.transport
            .control_out(Request::JumpToBootloader, &[])
            .map_err(TransferError::transport(Command::JumpToBootloader))?;
        Ok(())
    }

    /// Bytes waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    /// Bytes already pulled from the device but not yet read.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.staging.remaining()
    }

    #[must_use]
    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

//! The bridge UART transmitter as a [`UartPort`].
//!
//! Writes block until the data has left the FIFO, so the busy flag the host
//! polls stays set for exactly as long as the target is still receiving.

use bridge_device::bridge_proto::BaudRate;
use bridge_device::UartPort;
use embassy_rp::uart::{Async, Error as UartError, UartTx};
use embedded_io::{ErrorKind, ErrorType, Write};

/// UART transmit failure.
#[derive(Debug, defmt::Format)]
pub struct TxError(pub UartError);

impl embedded_io::Error for TxError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Transmit half of the bridge UART.
pub struct BridgeUart<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> BridgeUart<'d> {
    #[must_use]
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl ErrorType for BridgeUart<'_> {
    type Error = TxError;
}

impl Write for BridgeUart<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.blocking_write(buf).map_err(TxError)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx.blocking_flush().map_err(TxError)
    }
}

impl UartPort for BridgeUart<'_> {
    fn set_baud_rate(&mut self, rate: BaudRate) {
        // TX and RX share the divisor, so this retimes both directions.
        self.tx.set_baudrate(rate.bits_per_second());
    }
}

//! Device-side error type.

use core::fmt;

use bridge_proto::{Command, DecodeError};

/// Error type for dispatcher and control-transfer handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// UART transmit failed.
    Uart,
    /// A strapping pin could not be driven.
    Pin,
    /// A data stage larger than the write stage arrived.
    PayloadTooLong(usize),
    /// The request does not fit the direction it arrived on.
    WrongDirection(Command),
    /// The response buffer cannot hold the reply.
    ResponseBufferTooSmall,
    /// The setup packet could not be decoded.
    Decode(DecodeError),
}

impl From<DecodeError> for DeviceError {
    fn from(err: DecodeError) -> Self {
        DeviceError::Decode(err)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Uart => f.write_str("uart transmit failed"),
            DeviceError::Pin => f.write_str("strapping pin write failed"),
            DeviceError::PayloadTooLong(len) => write!(f, "payload of {len} bytes too long"),
            DeviceError::WrongDirection(cmd) => write!(f, "{cmd} received on wrong direction"),
            DeviceError::ResponseBufferTooSmall => f.write_str("response buffer too small"),
            DeviceError::Decode(e) => write!(f, "{e}"),
        }
    }
}

impl embedded_hal::digital::Error for DeviceError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeviceError {}

//! Decoded requests: an opcode plus its parameter.

use core::fmt;

use crate::baud::BaudRate;
use crate::command::{Command, Direction, UnknownCommand};
use crate::gpio::GpioPattern;

/// A vendor request with its `wValue` parameter decoded.
///
/// The data stage of `WriteUart` is not part of the request; it travels
/// alongside it as the transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    GetProgress,
    ReadUart,
    WriteUart,
    SetGpio(GpioPattern),
    SetBaudRate(BaudRate),
    JumpToBootloader,
}

impl Request {
    /// Decode `bRequest` and `wValue` from a setup packet.
    pub fn decode(opcode: u8, value: u16) -> Result<Self, DecodeError> {
        let command = Command::try_from(opcode).map_err(DecodeError::UnknownCommand)?;
        Ok(match command {
            Command::GetProgress => Request::GetProgress,
            Command::ReadUart => Request::ReadUart,
            Command::WriteUart => Request::WriteUart,
            Command::SetGpio => Request::SetGpio(GpioPattern::from_wire(value)),
            Command::SetBaudRate => Request::SetBaudRate(BaudRate::from_wire(value)),
            Command::JumpToBootloader => Request::JumpToBootloader,
        })
    }

    /// Opcode of this request.
    #[inline]
    #[must_use]
    pub const fn command(self) -> Command {
        match self {
            Request::GetProgress => Command::GetProgress,
            Request::ReadUart => Command::ReadUart,
            Request::WriteUart => Command::WriteUart,
            Request::SetGpio(_) => Command::SetGpio,
            Request::SetBaudRate(_) => Command::SetBaudRate,
            Request::JumpToBootloader => Command::JumpToBootloader,
        }
    }

    /// `wValue` for this request.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Request::SetGpio(pattern) => pattern.to_wire(),
            Request::SetBaudRate(rate) => rate.to_wire(),
            _ => 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn direction(self) -> Direction {
        self.command().direction()
    }
}

/// Error decoding a setup packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// `bRequest` is not a known opcode.
    UnknownCommand(UnknownCommand),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownCommand(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gpio_parameter() {
        let req = Request::decode(0x03, 6).unwrap();
        assert_eq!(req, Request::SetGpio(GpioPattern::DOWNLOAD));
        assert_eq!(req.value(), 6);
    }

    #[test]
    fn test_decode_baud_parameter() {
        assert_eq!(
            Request::decode(0x04, 0).unwrap(),
            Request::SetBaudRate(BaudRate::Rom)
        );
        assert_eq!(
            Request::decode(0x04, 1).unwrap(),
            Request::SetBaudRate(BaudRate::Standard)
        );
    }

    #[test]
    fn test_decode_ignores_value_for_data_commands() {
        assert_eq!(Request::decode(0x01, 0x1234).unwrap(), Request::ReadUart);
        assert_eq!(Request::WriteUart.value(), 0);
    }

    #[test]
    fn test_decode_unknown_opcode() {
        assert_eq!(
            Request::decode(0x42, 0),
            Err(DecodeError::UnknownCommand(UnknownCommand(0x42)))
        );
    }
}

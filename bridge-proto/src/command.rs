//! Opcodes and per-opcode direction.

use core::fmt;

/// Transfer direction of a control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device (control OUT).
    Out,
    /// Device to host (control IN).
    In,
}

/// Vendor request opcode, carried in `bRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Query the busy/idle flag. Response: 1 byte.
    GetProgress = 0x00,
    /// Drain the device receive ring. Response: 0..=32 bytes.
    ReadUart = 0x01,
    /// Transmit the data stage over the UART.
    WriteUart = 0x02,
    /// Apply a 3-bit strapping pattern (in `wValue`).
    SetGpio = 0x03,
    /// Select one of the two supported baud rates (in `wValue`).
    SetBaudRate = 0x04,
    /// Reboot the bridge into its own USB bootloader.
    JumpToBootloader = 0xB0,
}

impl Command {
    /// All opcodes understood by the bridge.
    pub const ALL: [Command; 6] = [
        Command::GetProgress,
        Command::ReadUart,
        Command::WriteUart,
        Command::SetGpio,
        Command::SetBaudRate,
        Command::JumpToBootloader,
    ];

    /// Direction of the data stage for this opcode.
    #[inline]
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Command::GetProgress | Command::ReadUart => Direction::In,
            _ => Direction::Out,
        }
    }

    /// Whether the host attaches a data stage to this opcode.
    #[inline]
    #[must_use]
    pub const fn carries_payload(self) -> bool {
        matches!(self, Command::WriteUart)
    }

    /// Raw `bRequest` value.
    #[inline]
    #[must_use]
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

/// Error for a `bRequest` value that is not a known opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownCommand(pub u8);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command 0x{:02x}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownCommand {}

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.opcode() == value)
            .ok_or(UnknownCommand(value))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::GetProgress => "get-progress",
            Command::ReadUart => "read-uart",
            Command::WriteUart => "write-uart",
            Command::SetGpio => "set-gpio",
            Command::SetBaudRate => "set-baud-rate",
            Command::JumpToBootloader => "jump-to-bootloader",
        };
        f.write_str(name)
    }
}

/// Busy/idle flag reported by `GetProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// No UART transmission in flight.
    #[default]
    Idle,
    /// The last written chunk is still being drained to the wire.
    Busy,
}

impl Progress {
    /// Encode as the single response byte.
    #[inline]
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Progress::Idle => 0,
            Progress::Busy => 1,
        }
    }

    /// Decode a response byte. Any non-zero value means busy.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Progress::Idle
        } else {
            Progress::Busy
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Progress::Idle)
    }
}

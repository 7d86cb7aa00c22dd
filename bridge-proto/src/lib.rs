//! Vendor control-transfer command set for the USB-to-UART bridge.
//!
//! This crate is the wire contract shared by the bridge firmware and the
//! host transfer engine:
//!
//! - **Opcodes**: [`Command`] - the `bRequest` byte of every control transfer
//! - **Requests**: [`Request`] - an opcode together with its decoded parameter
//! - **Strapping**: [`GpioPattern`] - the 3-bit boot/reset/enable pin pattern
//! - **Baud rates**: [`BaudRate`] - the closed set of supported UART rates
//! - **Progress**: [`Progress`] - the busy/idle flag returned by `GetProgress`
//!
//! # Framing
//!
//! Every command is a single vendor control transfer addressed to interface 0:
//!
//! ```text
//! bRequest = opcode, wValue = parameter, wIndex = 0, data = 0..=32 bytes
//! ```
//!
//! There is no length prefix, checksum or sequence number. The data stage is
//! the only payload and it never exceeds [`MAX_PACKET_LEN`] bytes.
//!
//! # Example
//!
//! ```
//! use bridge_proto::{BaudRate, Command, GpioPattern, Request};
//!
//! let request = Request::SetGpio(GpioPattern::DOWNLOAD);
//! assert_eq!(request.command(), Command::SetGpio);
//! assert_eq!(request.value(), 6);
//!
//! let decoded = Request::decode(Command::SetBaudRate as u8, 0).unwrap();
//! assert_eq!(decoded, Request::SetBaudRate(BaudRate::Rom));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host use)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod baud;
pub mod command;
pub mod gpio;
pub mod request;

pub use baud::BaudRate;
pub use command::{Command, Direction, Progress, UnknownCommand};
pub use gpio::GpioPattern;
pub use request::{DecodeError, Request};

/// Maximum size of a control-transfer data stage in either direction.
///
/// This is the endpoint 0 packet size of the bridge and the atomic transfer
/// unit of the protocol.
pub const MAX_PACKET_LEN: usize = 32;

/// USB vendor ID of the bridge (shared V-USB vendor ID).
pub const VENDOR_ID: u16 = 0x16c0;

/// USB product ID of the bridge (shared V-USB vendor class product ID).
pub const PRODUCT_ID: u16 = 0x05dc;

/// Manufacturer string reported by the bridge.
///
/// The VID/PID pair is shared, so the host also matches on the strings.
pub const MANUFACTURER: &str = "uart-bridge";

/// Product string reported by the bridge.
pub const PRODUCT: &str = "strap-uart";

/// Interface number that receives the vendor requests.
pub const INTERFACE: u8 = 0;

//! Host side of the USB-to-UART bridge.
//!
//! The bridge exposes its UART and three strapping pins through vendor
//! control transfers only. This crate turns that into ordinary blocking
//! reads and writes:
//!
//! - [`engine`]: the [`TransferEngine`], which chunks, paces and polls
//! - [`transport`]: the [`ControlTransport`] seam the engine talks through
//! - [`usb`]: [`NusbTransport`], the real device via `nusb`
//! - [`strap`]: boot and reset pin sequences for the target chip
//! - [`config`], [`stats`], [`clock`], [`error`]
//!
//! # Example
//!
//! ```no_run
//! use bridge_host::{NusbTransport, TransferEngine, UsbConfig};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = NusbTransport::open(&UsbConfig::default())?;
//! let mut engine = TransferEngine::new(transport);
//!
//! engine.enter_boot_mode()?;
//! engine.set_baud_rate(115_200)?;
//! engine.write(&[0xC0, 0x00, 0x08])?;
//! engine.flush(Duration::from_secs(5))?;
//!
//! let mut reply = [0u8; 8];
//! engine.read(&mut reply, Duration::from_millis(100))?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;
pub mod strap;
pub mod transport;
pub mod usb;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{EngineConfig, ShortTransferPolicy};
pub use engine::{TransferEngine, OUTBOUND_CAPACITY};
pub use error::{Operation, TransferError, TransportError};
pub use stats::WriteStats;
pub use strap::StrapStep;
pub use transport::ControlTransport;
pub use usb::{NusbTransport, UsbConfig, TRANSFER_TIMEOUT};

// Re-export the wire contract for convenience
pub use bridge_proto;

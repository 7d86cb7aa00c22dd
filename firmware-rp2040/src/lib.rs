//! USB-to-UART bridge with ESP boot strapping for RP2040.
//!
//! The host talks to the bridge only through vendor control transfers on
//! interface 0: it writes UART data in chunks of at most 32 bytes, polls a
//! busy flag, pulls received bytes, and drives three strapping pins that put
//! an ESP8266/ESP32 target into its serial bootloader.
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART1 TX | 8    | To target RX |
//! | UART1 RX | 9    | From target TX |
//! | BOOT     | 2    | Target GPIO0 (boot select) |
//! | RESET    | 3    | Target RST (active low) |
//! | ENABLE   | 4    | Target EN / CH_PD |
//! | LED      | 25   | On-board LED (heartbeat) |
//!
//! # Architecture
//!
//! - **USB task** and **UART receive task** run on an interrupt executor and
//!   preempt the main loop. The USB task answers control transfers from
//!   [`LinkState`](bridge_device::LinkState) and pulls the reset line low
//!   on `SetGpio 0` without waiting for the main loop; the receive task
//!   feeds the receive ring.
//! - **Main loop** runs on the thread executor. It waits on the command
//!   mailbox for at most 200 ms, executes the command through the
//!   [`Dispatcher`](bridge_device::Dispatcher) or toggles the heartbeat LED.
//!
//! # Modules
//!
//! - [`usb_vendor`]: vendor request handler ([`VendorHandler`])
//! - [`uart_link`]: UART transmitter adapter ([`BridgeUart`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

pub use bridge_device::{
    bridge_proto, DeviceError, Dispatcher, LinkState, PendingCommand, SharedPin, StrapPins,
    GREETING, HEARTBEAT_MS,
};

pub mod uart_link;
pub mod usb_vendor;

pub use uart_link::{BridgeUart, TxError};
pub use usb_vendor::{configure_vendor_interface, VendorHandler};

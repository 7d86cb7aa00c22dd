//! Platform-agnostic command dispatcher for the USB-to-UART bridge.
//!
//! This crate contains everything the bridge firmware does that does not
//! touch a specific chip, so it can be tested on the host.
//!
//! # Overview
//!
//! - [`link`]: state shared with interrupt context ([`LinkState`]) and the
//!   control-transfer handlers
//! - [`mailbox`]: single-slot command handoff ([`Mailbox`])
//! - [`ring`]: receive ring with overwrite-oldest policy ([`ReceiveRing`])
//! - [`stage`]: staged write payload ([`WriteStage`])
//! - [`hal`]: hardware seams ([`UartPort`], [`StrapPins`], [`SharedPin`])
//! - [`dispatcher`]: the main loop ([`Dispatcher`])
//!
//! # Execution model
//!
//! ```text
//! USB handler ──control_out──► Mailbox ──step()──► Dispatcher ──► UART / pins
//!      ▲                                                │
//!      └──control_in◄── ReceiveRing ◄── UART receive    └─► busy flag
//! ```
//!
//! The USB handler and the UART receive path preempt the main loop. They
//! never block: writes are staged and posted, reads drain the ring in a
//! single critical section.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod dispatcher;
pub mod error;
pub mod hal;
pub mod link;
pub mod mailbox;
pub mod ring;
pub mod stage;

pub use dispatcher::{DispatchState, Dispatcher, GREETING, HEARTBEAT_MS, INTER_PIN_DELAY_MS};
pub use error::DeviceError;
pub use hal::{SharedPin, StrapPins, UartPort};
pub use link::{LinkState, OutOutcome};
pub use mailbox::{Mailbox, PendingCommand};
pub use ring::{ReceiveRing, RING_CAPACITY};
pub use stage::{Chunk, WriteStage};

// Re-export the wire contract for convenience
pub use bridge_proto;

//! Vendor control-transfer handler.
//!
//! embassy-usb hands us each control transfer on endpoint 0 with its setup
//! and data stages merged. Requests addressed to the bridge interface are
//! decoded and passed straight to [`LinkState`]; nothing here blocks.

use bridge_device::{LinkState, OutOutcome, SharedPin};
use defmt::{info, warn};
use embassy_rp::gpio::Output;
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Handler};

/// Interface class, subclass and protocol of the bridge: vendor specific.
const VENDOR_CLASS: u8 = 0xFF;

/// Routes vendor requests on the bridge interface to a [`LinkState`].
pub struct VendorHandler {
    link: &'static LinkState,
    reset: &'static SharedPin<Output<'static>>,
    interface: u8,
}

impl VendorHandler {
    /// `reset` is the same line the dispatcher drives as its reset pin.
    #[must_use]
    pub const fn new(
        link: &'static LinkState,
        reset: &'static SharedPin<Output<'static>>,
    ) -> Self {
        Self {
            link,
            reset,
            interface: 0,
        }
    }

    fn is_ours(&self, req: &Request) -> bool {
        req.request_type == RequestType::Vendor
            && req.recipient == Recipient::Interface
            && req.index == u16::from(self.interface)
    }
}

impl Handler for VendorHandler {
    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if !self.is_ours(&req) {
            return None;
        }

        let outcome =
            LinkState::decode(req.request, req.value).and_then(|r| self.link.control_out(r, data));
        Some(match outcome {
            Ok(OutOutcome::Accepted) => OutResponse::Accepted,
            Ok(OutOutcome::AssertReset) => {
                if let Err(e) = self.reset.set(false) {
                    warn!("Reset assert failed: {}", e);
                }
                OutResponse::Accepted
            }
            Ok(OutOutcome::JumpToBootloader) => {
                info!("Rebooting into USB bootloader");
                embassy_rp::rom_data::reset_to_usb_boot(0, 0);
                OutResponse::Accepted
            }
            Err(e) => {
                warn!("Rejected OUT request 0x{:02x}: {}", req.request, e);
                OutResponse::Rejected
            }
        })
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if !self.is_ours(&req) {
            return None;
        }

        let limit = usize::from(req.length).min(buf.len());
        let result = LinkState::decode(req.request, req.value)
            .and_then(|r| self.link.control_in(r, &mut buf[..limit]));
        Some(match result {
            Ok(n) => InResponse::Accepted(&buf[..n]),
            Err(e) => {
                warn!("Rejected IN request 0x{:02x}: {}", req.request, e);
                InResponse::Rejected
            }
        })
    }
}

/// Add the vendor interface to the device and register `handler` for it.
pub fn configure_vendor_interface<'d, D: Driver<'d>>(
    builder: &mut Builder<'d, D>,
    handler: &'d mut VendorHandler,
) {
    let interface = {
        let mut function = builder.function(VENDOR_CLASS, 0, 0);
        let mut interface = function.interface();
        let number = interface.interface_number();
        interface.alt_setting(VENDOR_CLASS, 0, 0, None);
        number
    };

    handler.interface = u8::from(interface);
    builder.handler(handler);
}

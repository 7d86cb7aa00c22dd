//! [`ControlTransport`] over a real USB device, using `nusb`.

use std::time::Duration;

use bridge_proto::{Request, INTERFACE, MANUFACTURER, PRODUCT, PRODUCT_ID, VENDOR_ID};
use log::{debug, info};
use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::{DeviceInfo, MaybeFuture};

use crate::error::TransportError;
use crate::transport::ControlTransport;

/// Timeout applied to every control transfer.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(80);

/// How to find and address the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Required manufacturer string, if any.
    pub manufacturer: Option<String>,
    /// Required product string, if any.
    pub product: Option<String>,
    pub interface: u8,
    pub timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            manufacturer: Some(MANUFACTURER.to_owned()),
            product: Some(PRODUCT.to_owned()),
            interface: INTERFACE,
            timeout: TRANSFER_TIMEOUT,
        }
    }
}

impl UsbConfig {
    /// Whether `dev` is the bridge this config describes.
    ///
    /// Strings are only compared when the OS reports them.
    fn matches(&self, dev: &DeviceInfo) -> bool {
        fn string_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
            match (wanted, actual) {
                (Some(w), Some(a)) => w == a,
                _ => true,
            }
        }

        dev.vendor_id() == self.vendor_id
            && dev.product_id() == self.product_id
            && string_matches(self.manufacturer.as_deref(), dev.manufacturer_string())
            && string_matches(self.product.as_deref(), dev.product_string())
    }
}

/// The bridge's vendor interface, claimed for exclusive use.
pub struct NusbTransport {
    // Keeps the device open for the lifetime of the interface.
    _device: nusb::Device,
    interface: nusb::Interface,
    interface_number: u8,
    timeout: Duration,
}

impl NusbTransport {
    /// Open the first bridge matching `config`.
    pub fn open(config: &UsbConfig) -> Result<Self, TransportError> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| config.matches(d))
            .ok_or(TransportError::DeviceNotFound {
                vid: config.vendor_id,
                pid: config.product_id,
            })?;

        info!(
            "Found bridge {:04x}:{:04x} at address {}",
            dev_info.vendor_id(),
            dev_info.product_id(),
            dev_info.device_address()
        );

        let device = dev_info.open().wait()?;
        let interface = device
            .detach_and_claim_interface(config.interface)
            .wait()?;

        Ok(Self {
            _device: device,
            interface,
            interface_number: config.interface,
            timeout: config.timeout,
        })
    }
}

impl ControlTransport for NusbTransport {
    fn control_out(&mut self, request: Request, data: &[u8]) -> Result<usize, TransportError> {
        debug!("OUT {} value={} len={}", request.command(), request.value(), data.len());
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Interface,
                    request: request.command().opcode(),
                    value: request.value(),
                    index: u16::from(self.interface_number),
                    data,
                },
                self.timeout,
            )
            .wait()?;
        Ok(data.len())
    }

    fn control_in(&mut self, request: Request, buf: &mut [u8]) -> Result<usize, TransportError> {
        let length = u16::try_from(buf.len()).unwrap_or(u16::MAX);
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Interface,
                    request: request.command().opcode(),
                    value: request.value(),
                    index: u16::from(self.interface_number),
                    length,
                },
                self.timeout,
            )
            .wait()?;

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        debug!("IN {} -> {} bytes", request.command(), n);
        Ok(n)
    }
}

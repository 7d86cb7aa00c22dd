//! The control-transfer seam between the engine and a USB backend.

use bridge_proto::Request;

use crate::error::TransportError;

/// Vendor control transfers to the bridge.
///
/// Implementations encode [`Request`] as `bRequest`/`wValue` and address the
/// bridge interface. The engine never sees USB details beyond this trait, so
/// tests substitute a scripted device.
pub trait ControlTransport {
    /// Host-to-device request with an optional data stage.
    ///
    /// Returns the number of payload bytes the device accepted.
    fn control_out(&mut self, request: Request, data: &[u8]) -> Result<usize, TransportError>;

    /// Device-to-host request. At most `buf.len()` bytes are requested.
    ///
    /// Returns the number of bytes written into `buf`, which may be zero.
    fn control_in(&mut self, request: Request, buf: &mut [u8]) -> Result<usize, TransportError>;
}

impl<T: ControlTransport + ?Sized> ControlTransport for &mut T {
    fn control_out(&mut self, request: Request, data: &[u8]) -> Result<usize, TransportError> {
        (**self).control_out(request, data)
    }

    fn control_in(&mut self, request: Request, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).control_in(request, buf)
    }
}

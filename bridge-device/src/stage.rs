//! Write stage: one `WriteUart` payload waiting for the main loop.

use bridge_proto::MAX_PACKET_LEN;
use heapless::Vec;

use crate::error::DeviceError;

/// One chunk of outbound UART data.
pub type Chunk = Vec<u8, MAX_PACKET_LEN>;

/// Holds the most recent `WriteUart` data stage.
pub struct WriteStage {
    chunk: Chunk,
}

impl WriteStage {
    #[must_use]
    pub const fn new() -> Self {
        Self { chunk: Vec::new() }
    }

    /// Replace the staged chunk with `data`.
    ///
    /// Nothing is staged if `data` exceeds the packet size.
    pub fn load(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        let chunk = Chunk::from_slice(data).map_err(|_| DeviceError::PayloadTooLong(data.len()))?;
        self.chunk = chunk;
        Ok(())
    }

    /// Take the staged chunk, leaving the stage empty.
    pub fn take(&mut self) -> Chunk {
        core::mem::take(&mut self.chunk)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunk.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }
}

impl Default for WriteStage {
    fn default() -> Self {
        Self::new()
    }
}

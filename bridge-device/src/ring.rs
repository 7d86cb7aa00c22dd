//! Fixed-capacity receive ring.
//!
//! Filled one byte at a time by the UART receive path and drained as a whole
//! by the host's `ReadUart` command. There is no flow control towards the
//! host, so when the ring is full the oldest unread byte is overwritten.

use bridge_proto::MAX_PACKET_LEN;
use heapless::Deque;

/// Capacity of the receive ring. One full ring fits one control transfer.
pub const RING_CAPACITY: usize = MAX_PACKET_LEN;

/// Receive ring with overwrite-oldest overflow policy.
pub struct ReceiveRing {
    bytes: Deque<u8, RING_CAPACITY>,
    overwritten: u32,
}

impl ReceiveRing {
    /// Create an empty ring.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
            overwritten: 0,
        }
    }

    /// Append one received byte, evicting the oldest byte if full.
    ///
    /// Returns `true` if a byte was evicted.
    pub fn push(&mut self, byte: u8) -> bool {
        let evicted = if self.bytes.is_full() {
            self.bytes.pop_front();
            self.overwritten = self.overwritten.wrapping_add(1);
            true
        } else {
            false
        };
        // Cannot fail: a slot was freed above if the ring was full.
        let _ = self.bytes.push_back(byte);
        evicted
    }

    /// Move the buffered bytes into `out`, oldest first, and reset the ring.
    ///
    /// Returns the number of bytes written. If `out` is shorter than the
    /// ring, the bytes that do not fit are discarded with the rest.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        for (slot, byte) in out.iter_mut().zip(self.bytes.iter()) {
            *slot = *byte;
            n += 1;
        }
        self.bytes.clear();
        n
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Total number of bytes lost to overwrite since power-on.
    #[inline]
    #[must_use]
    pub fn overwritten(&self) -> u32 {
        self.overwritten
    }
}

impl Default for ReceiveRing {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-chunk write statistics.

use std::fmt;

use bridge_proto::MAX_PACKET_LEN;

/// Accepted length of every `WriteUart` transfer since the engine was
/// created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStats {
    chunks: u32,
    total: u64,
    min: Option<usize>,
    max: Option<usize>,
    histogram: [u32; MAX_PACKET_LEN + 1],
}

impl Default for WriteStats {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunks: 0,
            total: 0,
            min: None,
            max: None,
            histogram: [0; MAX_PACKET_LEN + 1],
        }
    }

    /// Record one transfer that carried `accepted` bytes.
    pub fn record(&mut self, accepted: usize) {
        let accepted = accepted.min(MAX_PACKET_LEN);
        self.chunks += 1;
        self.total += accepted as u64;
        self.min = Some(self.min.map_or(accepted, |m| m.min(accepted)));
        self.max = Some(self.max.map_or(accepted, |m| m.max(accepted)));
        self.histogram[accepted] += 1;
    }

    #[must_use]
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn min(&self) -> Option<usize> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Number of transfers that carried exactly `len` bytes.
    #[must_use]
    pub fn count_of(&self, len: usize) -> u32 {
        self.histogram.get(len).copied().unwrap_or(0)
    }
}

impl fmt::Display for WriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chunks: {}, bytes: {}", self.chunks, self.total)?;
        if let (Some(min), Some(max)) = (self.min, self.max) {
            writeln!(f, "chunk size: min {min}, max {max}")?;
        }
        for (len, &count) in self.histogram.iter().enumerate().skip(1) {
            if count > 0 {
                writeln!(f, "{len:>3}: {count}")?;
            }
        }
        Ok(())
    }
}

//! Boot strapping sequences for the target chip.

use std::time::Duration;

use bridge_proto::GpioPattern;

/// One `SetGpio` command and the time to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrapStep {
    pub pattern: GpioPattern,
    pub hold: Duration,
}

impl StrapStep {
    const fn new(pattern: GpioPattern, hold_ms: u64) -> Self {
        Self {
            pattern,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// Hold everything low, then release reset and enable with boot still low
/// so the target samples its boot pin and enters the serial downloader.
pub const ENTER_BOOT: [StrapStep; 2] = [
    StrapStep::new(GpioPattern::ALL_LOW, 150),
    StrapStep::new(GpioPattern::DOWNLOAD, 4),
];

/// Hold everything low, then release all pins so the target boots from
/// flash.
pub const RESET: [StrapStep; 2] = [
    StrapStep::new(GpioPattern::ALL_LOW, 100),
    StrapStep::new(GpioPattern::RUN, 0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_releases_reset_with_boot_low() {
        let last = ENTER_BOOT[1].pattern;
        assert!(!last.boot());
        assert!(last.reset());
        assert!(last.enable());
    }

    #[test]
    fn test_reset_ends_with_everything_high() {
        assert_eq!(RESET[1].pattern.bits(), 7);
        assert!(RESET[1].hold.is_zero());
    }
}

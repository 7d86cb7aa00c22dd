//! Strapping pin pattern.
//!
//! The `SetGpio` command carries three pin levels packed into the low bits
//! of `wValue`. The device applies them one bit at a time, in bit order, with
//! a fixed delay between pins:
//!
//! | Bit | Pin          |
//! |-----|--------------|
//! | 0   | boot select  |
//! | 1   | reset (active low) |
//! | 2   | chip enable  |

use core::fmt;

/// Three strapping pin levels packed as `enable << 2 | reset << 1 | boot`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioPattern(u8);

impl GpioPattern {
    const BOOT: u8 = 1 << 0;
    const RESET: u8 = 1 << 1;
    const ENABLE: u8 = 1 << 2;
    const MASK: u8 = Self::BOOT | Self::RESET | Self::ENABLE;

    /// Every pin low: target held in reset and disabled.
    pub const ALL_LOW: Self = Self(0);

    /// Boot select low, reset released, enabled: target starts its serial
    /// download mode.
    pub const DOWNLOAD: Self = Self(Self::RESET | Self::ENABLE);

    /// Every pin high: target boots from flash.
    pub const RUN: Self = Self(Self::BOOT | Self::RESET | Self::ENABLE);

    /// Build a pattern from individual pin levels.
    #[inline]
    #[must_use]
    pub const fn new(boot: bool, reset: bool, enable: bool) -> Self {
        let mut bits = 0;
        if boot {
            bits |= Self::BOOT;
        }
        if reset {
            bits |= Self::RESET;
        }
        if enable {
            bits |= Self::ENABLE;
        }
        Self(bits)
    }

    /// Decode from `wValue`. Bits above bit 2 are ignored.
    #[inline]
    #[must_use]
    pub const fn from_wire(value: u16) -> Self {
        Self((value as u8) & Self::MASK)
    }

    /// Encode for `wValue`.
    #[inline]
    #[must_use]
    pub const fn to_wire(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn boot(self) -> bool {
        self.0 & Self::BOOT != 0
    }

    #[inline]
    #[must_use]
    pub const fn reset(self) -> bool {
        self.0 & Self::RESET != 0
    }

    #[inline]
    #[must_use]
    pub const fn enable(self) -> bool {
        self.0 & Self::ENABLE != 0
    }

    /// Pin levels in the order the device applies them.
    #[inline]
    #[must_use]
    pub const fn levels(self) -> [bool; 3] {
        [self.boot(), self.reset(), self.enable()]
    }
}

impl fmt::Debug for GpioPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioPattern")
            .field("boot", &self.boot())
            .field("reset", &self.reset())
            .field("enable", &self.enable())
            .finish()
    }
}

impl fmt::Display for GpioPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

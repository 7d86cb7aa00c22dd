//! Supported UART baud rates.
//!
//! The bridge only knows two rates. The host maps any requested rate onto
//! one of them; the device reprograms its UART from the selector bit.

use core::fmt;

/// Closed set of UART rates, selected by a single bit in `wValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    /// 74 880 baud, the rate the target ROM prints its boot log at.
    /// Selector `0`.
    Rom,
    /// 115 200 baud, the bridge power-on default. Selector `1`.
    Standard,
}

impl BaudRate {
    /// Rate the device configures at power-on.
    pub const POWER_ON: Self = BaudRate::Standard;

    /// Map a requested rate onto the supported set.
    ///
    /// Only 74 880 selects [`BaudRate::Rom`]; every other value maps to
    /// [`BaudRate::Standard`].
    #[inline]
    #[must_use]
    pub const fn from_rate(rate: u32) -> Self {
        if rate == 74_880 {
            BaudRate::Rom
        } else {
            BaudRate::Standard
        }
    }

    /// Decode the selector from the low byte of `wValue`. Zero is
    /// [`BaudRate::Rom`].
    #[inline]
    #[must_use]
    pub const fn from_wire(value: u16) -> Self {
        if value as u8 == 0 {
            BaudRate::Rom
        } else {
            BaudRate::Standard
        }
    }

    /// Encode the selector for `wValue`.
    #[inline]
    #[must_use]
    pub const fn to_wire(self) -> u16 {
        match self {
            BaudRate::Rom => 0,
            BaudRate::Standard => 1,
        }
    }

    /// Line rate in bits per second.
    #[inline]
    #[must_use]
    pub const fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::Rom => 74_880,
            BaudRate::Standard => 115_200,
        }
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self::POWER_ON
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rom_rate_selects_zero() {
        assert_eq!(BaudRate::from_rate(74_880), BaudRate::Rom);
        assert_eq!(BaudRate::from_rate(115_200), BaudRate::Standard);
        assert_eq!(BaudRate::from_rate(9_600), BaudRate::Standard);
        assert_eq!(BaudRate::from_rate(921_600), BaudRate::Standard);
    }

    #[test]
    fn test_selector_bits() {
        assert_eq!(BaudRate::Rom.to_wire(), 0);
        assert_eq!(BaudRate::Standard.to_wire(), 1);
        assert_eq!(BaudRate::from_wire(0), BaudRate::Rom);
        assert_eq!(BaudRate::from_wire(7), BaudRate::Standard);
    }

    #[test]
    fn test_selector_ignores_high_byte() {
        assert_eq!(BaudRate::from_wire(0x0100), BaudRate::Rom);
        assert_eq!(BaudRate::from_wire(0xFF00), BaudRate::Rom);
        assert_eq!(BaudRate::from_wire(0x0101), BaudRate::Standard);
    }

    #[test]
    fn test_power_on_default() {
        assert_eq!(BaudRate::default().bits_per_second(), 115_200);
    }
}

//! Hardware seams of the dispatcher: the UART and the strapping pins.

use core::cell::RefCell;

use bridge_proto::{BaudRate, GpioPattern};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::error::DeviceError;

/// Blocking UART transmitter whose line rate can be changed at runtime.
///
/// Transmission goes through [`embedded_io::Write`]; `flush` must not return
/// before the last byte has left the shift register.
pub trait UartPort: embedded_io::Write {
    /// Reprogram the line rate. Takes effect for both directions.
    fn set_baud_rate(&mut self, rate: BaudRate);
}

/// The three strapping outputs wired to the target chip.
pub struct StrapPins<B, R, E> {
    boot: B,
    reset: R,
    enable: E,
}

impl<B, R, E> StrapPins<B, R, E>
where
    B: OutputPin,
    R: OutputPin,
    E: OutputPin,
{
    pub fn new(boot: B, reset: R, enable: E) -> Self {
        Self { boot, reset, enable }
    }

    /// Drive the boot-select pin.
    pub fn set_boot(&mut self, high: bool) -> Result<(), DeviceError> {
        self.boot
            .set_state(PinState::from(high))
            .map_err(|_| DeviceError::Pin)
    }

    /// Drive the reset pin (active low on the target).
    pub fn set_reset(&mut self, high: bool) -> Result<(), DeviceError> {
        self.reset
            .set_state(PinState::from(high))
            .map_err(|_| DeviceError::Pin)
    }

    /// Drive the chip-enable pin.
    pub fn set_enable(&mut self, high: bool) -> Result<(), DeviceError> {
        self.enable
            .set_state(PinState::from(high))
            .map_err(|_| DeviceError::Pin)
    }

    /// Drive all three pins low at once, without inter-pin delays. Holds
    /// the target in reset.
    pub fn hold_all_low(&mut self) -> Result<(), DeviceError> {
        self.set_enable(false)?;
        self.set_reset(false)?;
        self.set_boot(false)
    }

    /// Set one pin from `pattern`, selected by its bit position.
    pub(crate) fn apply_bit(
        &mut self,
        pattern: GpioPattern,
        bit: usize,
    ) -> Result<(), DeviceError> {
        let level = pattern.levels()[bit];
        match bit {
            0 => self.set_boot(level),
            1 => self.set_reset(level),
            _ => self.set_enable(level),
        }
    }

    /// Decompose into the individual pins.
    pub fn into_parts(self) -> (B, R, E) {
        (self.boot, self.reset, self.enable)
    }
}

/// An output pin driven from both the USB handler and the main loop.
///
/// The reset line is asserted straight from interrupt context on
/// `SetGpio 0`, while the dispatcher still owns it through [`StrapPins`].
/// `&SharedPin` implements [`OutputPin`], so it slots into either.
pub struct SharedPin<P> {
    pin: Mutex<CriticalSectionRawMutex, RefCell<Option<P>>>,
}

impl<P> SharedPin<P> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pin: Mutex::new(RefCell::new(None)),
        }
    }

    /// Hand over the pin. Until then every write fails with
    /// [`DeviceError::Pin`].
    pub fn install(&self, pin: P) {
        self.pin.lock(|slot| *slot.borrow_mut() = Some(pin));
    }
}

impl<P: OutputPin> SharedPin<P> {
    pub fn set(&self, high: bool) -> Result<(), DeviceError> {
        self.pin.lock(|slot| match slot.borrow_mut().as_mut() {
            Some(pin) => pin
                .set_state(PinState::from(high))
                .map_err(|_| DeviceError::Pin),
            None => Err(DeviceError::Pin),
        })
    }
}

impl<P> Default for SharedPin<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> ErrorType for &SharedPin<P> {
    type Error = DeviceError;
}

impl<P: OutputPin> OutputPin for &SharedPin<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::convert::Infallible;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Level(Rc<Cell<Option<bool>>>);

    impl ErrorType for Level {
        type Error = Infallible;
    }

    impl OutputPin for Level {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.set(Some(false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.set(Some(true));
            Ok(())
        }
    }

    fn pins() -> (StrapPins<Level, Level, Level>, [Rc<Cell<Option<bool>>>; 3]) {
        let cells = [(); 3].map(|()| Rc::new(Cell::new(None)));
        let pins = StrapPins::new(
            Level(cells[0].clone()),
            Level(cells[1].clone()),
            Level(cells[2].clone()),
        );
        (pins, cells)
    }

    #[test]
    fn test_apply_bit_follows_pattern() {
        let (mut p, cells) = pins();
        for bit in 0..3 {
            p.apply_bit(GpioPattern::DOWNLOAD, bit).unwrap();
        }
        assert_eq!(cells.each_ref().map(|c| c.get()), [Some(false), Some(true), Some(true)]);
    }

    #[test]
    fn test_hold_all_low() {
        let (mut p, cells) = pins();
        p.hold_all_low().unwrap();
        assert!(cells.iter().all(|c| c.get() == Some(false)));
    }

    #[test]
    fn test_shared_pin_driven_from_both_sides() {
        let reset = Rc::new(Cell::new(None));
        let shared = SharedPin::new();
        shared.install(Level(reset.clone()));

        let cells = [(); 2].map(|()| Rc::new(Cell::new(None)));
        let mut p = StrapPins::new(Level(cells[0].clone()), &shared, Level(cells[1].clone()));
        p.apply_bit(GpioPattern::RUN, 1).unwrap();
        assert_eq!(reset.get(), Some(true));

        // The USB handler asserts reset behind the dispatcher's back.
        shared.set(false).unwrap();
        assert_eq!(reset.get(), Some(false));
    }

    #[test]
    fn test_shared_pin_without_pin_fails() {
        let shared: SharedPin<Level> = SharedPin::new();
        assert_eq!(shared.set(false), Err(DeviceError::Pin));
        assert_eq!((&shared).set_high(), Err(DeviceError::Pin));
    }
}

//! Dispatcher: the cooperative main loop of the bridge.

use bridge_proto::{BaudRate, GpioPattern};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::DeviceError;
use crate::hal::{StrapPins, UartPort};
use crate::link::LinkState;
use crate::mailbox::PendingCommand;

/// Delay between consecutive strapping pins, in milliseconds.
pub const INTER_PIN_DELAY_MS: u32 = 2;

/// Longest the main loop waits for a command before toggling the
/// heartbeat LED, in milliseconds.
pub const HEARTBEAT_MS: u64 = 200;

/// Written to the UART once at start-up.
pub const GREETING: &[u8] = b"Hi!\r\n";

/// What the main loop is doing. Published through
/// [`LinkState::dispatch_state`] so interrupt context can read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    #[default]
    Idle,
    ExecutingWrite,
    ExecutingGpio,
    ExecutingBaud,
}

impl DispatchState {
    pub(crate) const fn to_raw(self) -> u8 {
        match self {
            DispatchState::Idle => 0,
            DispatchState::ExecutingWrite => 1,
            DispatchState::ExecutingGpio => 2,
            DispatchState::ExecutingBaud => 3,
        }
    }

    pub(crate) const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => DispatchState::ExecutingWrite,
            2 => DispatchState::ExecutingGpio,
            3 => DispatchState::ExecutingBaud,
            _ => DispatchState::Idle,
        }
    }
}

/// Executes mailbox commands against the UART and the strapping pins.
///
/// The mailbox is cleared before a command runs, so a command posted while
/// another one executes is picked up on the next iteration. Execution is
/// never interrupted: a staged chunk is always transmitted in full.
pub struct Dispatcher<'a, U, B, R, E, D> {
    link: &'a LinkState,
    uart: U,
    pins: StrapPins<B, R, E>,
    delay: D,
    baud: BaudRate,
}

impl<'a, U, B, R, E, D> Dispatcher<'a, U, B, R, E, D>
where
    U: UartPort,
    B: OutputPin,
    R: OutputPin,
    E: OutputPin,
    D: DelayNs,
{
    /// Create a dispatcher. The UART is assumed to run at
    /// [`BaudRate::POWER_ON`].
    pub fn new(link: &'a LinkState, uart: U, pins: StrapPins<B, R, E>, delay: D) -> Self {
        Self {
            link,
            uart,
            pins,
            delay,
            baud: BaudRate::POWER_ON,
        }
    }

    /// Write the start-up greeting to the UART.
    pub fn greet(&mut self) -> Result<(), DeviceError> {
        self.transmit(GREETING)
    }

    /// Run one main-loop iteration: take the pending command, if any, and
    /// execute it.
    ///
    /// Returns the command that ran.
    pub fn step(&mut self) -> Result<Option<PendingCommand>, DeviceError> {
        match self.link.mailbox().take() {
            Some(command) => self.execute(command).map(|()| Some(command)),
            None => Ok(None),
        }
    }

    /// Execute a command already taken from the mailbox.
    pub fn execute(&mut self, command: PendingCommand) -> Result<(), DeviceError> {
        let result = match command {
            PendingCommand::WriteUart => {
                self.link.set_dispatch_state(DispatchState::ExecutingWrite);
                self.write_staged()
            }
            PendingCommand::SetGpio(pattern) => {
                self.link.set_dispatch_state(DispatchState::ExecutingGpio);
                self.apply_gpio(pattern)
            }
            PendingCommand::SetBaudRate(rate) => {
                self.link.set_dispatch_state(DispatchState::ExecutingBaud);
                self.change_baud(rate);
                Ok(())
            }
        };
        self.link.set_dispatch_state(DispatchState::Idle);
        result
    }

    /// Transmit the staged chunk, then report idle.
    ///
    /// The flag goes idle even if the UART fails, otherwise the host would
    /// poll until its deadline.
    fn write_staged(&mut self) -> Result<(), DeviceError> {
        let chunk = self.link.take_chunk();
        let result = self.transmit(&chunk);
        self.link.set_idle();
        result
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.uart.write_all(bytes).map_err(|_| DeviceError::Uart)?;
        self.uart.flush().map_err(|_| DeviceError::Uart)
    }

    /// Apply boot, reset and enable in that order with a fixed gap.
    fn apply_gpio(&mut self, pattern: GpioPattern) -> Result<(), DeviceError> {
        self.pins.apply_bit(pattern, 0)?;
        self.delay.delay_ms(INTER_PIN_DELAY_MS);
        self.pins.apply_bit(pattern, 1)?;
        self.delay.delay_ms(INTER_PIN_DELAY_MS);
        self.pins.apply_bit(pattern, 2)
    }

    /// Anything received at the old rate is noise at the new one.
    fn change_baud(&mut self, rate: BaudRate) {
        self.link.discard_received();
        self.uart.set_baud_rate(rate);
        self.baud = rate;
    }

    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.link.dispatch_state()
    }

    /// Rate the UART was last programmed to.
    #[must_use]
    pub fn baud_rate(&self) -> BaudRate {
        self.baud
    }

    #[must_use]
    pub fn link(&self) -> &'a LinkState {
        self.link
    }

    /// Decompose into the UART, the pins and the delay provider.
    pub fn into_parts(self) -> (U, StrapPins<B, R, E>, D) {
        (self.uart, self.pins, self.delay)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use bridge_proto::{Request, MAX_PACKET_LEN};
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Tx(Vec<u8>),
        Flush,
        Baud(BaudRate),
        Pin(&'static str, bool),
        DelayMs(u32),
        State(DispatchState),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    /// Records the published dispatch state whenever a mock is touched.
    #[derive(Clone, Copy)]
    struct Watch(Option<&'static LinkState>);

    impl Watch {
        fn record(self, log: &Log) {
            if let Some(link) = self.0 {
                log.borrow_mut().push(Event::State(link.dispatch_state()));
            }
        }
    }

    struct MockUart {
        log: Log,
        watch: Watch,
    }

    impl embedded_io::ErrorType for MockUart {
        type Error = Infallible;
    }

    impl embedded_io::Write for MockUart {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.watch.record(&self.log);
            self.log.borrow_mut().push(Event::Tx(buf.to_vec()));
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Event::Flush);
            Ok(())
        }
    }

    impl UartPort for MockUart {
        fn set_baud_rate(&mut self, rate: BaudRate) {
            self.watch.record(&self.log);
            self.log.borrow_mut().push(Event::Baud(rate));
        }
    }

    struct MockPin {
        name: &'static str,
        log: Log,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Event::Pin(self.name, false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push(Event::Pin(self.name, true));
            Ok(())
        }
    }

    struct MockDelay {
        log: Log,
        watch: Watch,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.log.borrow_mut().push(Event::DelayMs(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.watch.record(&self.log);
            self.log.borrow_mut().push(Event::DelayMs(ms));
        }
    }

    type MockDispatcher<'a> = Dispatcher<'a, MockUart, MockPin, MockPin, MockPin, MockDelay>;

    fn dispatcher(link: &LinkState) -> (MockDispatcher<'_>, Log) {
        watched(link, Watch(None))
    }

    fn watched(link: &LinkState, watch: Watch) -> (MockDispatcher<'_>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let pin = |name| MockPin {
            name,
            log: log.clone(),
        };
        let pins = StrapPins::new(pin("boot"), pin("reset"), pin("enable"));
        let d = Dispatcher::new(
            link,
            MockUart {
                log: log.clone(),
                watch,
            },
            pins,
            MockDelay {
                log: log.clone(),
                watch,
            },
        );
        (d, log)
    }

    fn transmitted(log: &Log) -> Vec<u8> {
        log.borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Tx(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn test_write_transmits_stage_and_clears_busy() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);

        link.control_out(Request::WriteUart, b"\xC0\x00\x08sync").unwrap();
        assert!(!link.progress().is_idle());

        assert_eq!(d.step(), Ok(Some(PendingCommand::WriteUart)));
        assert_eq!(transmitted(&log), b"\xC0\x00\x08sync");
        assert_eq!(log.borrow().last(), Some(&Event::Flush));
        assert!(link.progress().is_idle());
        assert_eq!(d.state(), DispatchState::Idle);
    }

    #[test]
    fn test_full_chunk_transmitted_in_order() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);
        let chunk: Vec<u8> = (0..MAX_PACKET_LEN as u8).collect();

        link.control_out(Request::WriteUart, &chunk).unwrap();
        d.step().unwrap();
        assert_eq!(transmitted(&log), chunk);
    }

    #[test]
    fn test_step_without_command_does_nothing() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);
        assert_eq!(d.step(), Ok(None));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_gpio_applied_in_pin_order_with_delays() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);

        link.control_out(Request::SetGpio(GpioPattern::DOWNLOAD), &[]).unwrap();
        d.step().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Pin("boot", false),
                Event::DelayMs(INTER_PIN_DELAY_MS),
                Event::Pin("reset", true),
                Event::DelayMs(INTER_PIN_DELAY_MS),
                Event::Pin("enable", true),
            ]
        );
    }

    #[test]
    fn test_baud_change_discards_received_data() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);
        link.uart_received_all(b"garbage at the old rate");

        link.control_out(Request::SetBaudRate(BaudRate::Rom), &[]).unwrap();
        d.step().unwrap();

        assert_eq!(*log.borrow(), vec![Event::Baud(BaudRate::Rom)]);
        assert_eq!(d.baud_rate(), BaudRate::Rom);
        let mut buf = [0u8; MAX_PACKET_LEN];
        assert_eq!(link.control_in(Request::ReadUart, &mut buf), Ok(0));
    }

    #[test]
    fn test_back_to_back_commands_only_last_runs() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);

        // Both arrive before the main loop looks at the mailbox.
        link.control_out(Request::SetGpio(GpioPattern::RUN), &[]).unwrap();
        link.control_out(Request::SetBaudRate(BaudRate::Rom), &[]).unwrap();

        assert_eq!(d.step(), Ok(Some(PendingCommand::SetBaudRate(BaudRate::Rom))));
        assert_eq!(d.step(), Ok(None));
        assert!(log.borrow().iter().all(|e| !matches!(e, Event::Pin(..))));
    }

    #[test]
    fn test_command_posted_during_execution_runs_next_iteration() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);

        link.control_out(Request::WriteUart, b"first").unwrap();
        let command = link.mailbox().take().unwrap();
        // Arrives after the main loop cleared the slot.
        link.control_out(Request::SetGpio(GpioPattern::ALL_LOW), &[]).unwrap();
        d.execute(command).unwrap();

        assert_eq!(transmitted(&log), b"first");
        assert_eq!(d.step(), Ok(Some(PendingCommand::SetGpio(GpioPattern::ALL_LOW))));
    }

    #[test]
    fn test_greeting() {
        let link = LinkState::new();
        let (mut d, log) = dispatcher(&link);
        d.greet().unwrap();
        assert_eq!(transmitted(&log), GREETING);
    }

    #[test]
    fn test_state_published_while_executing() {
        static LINK: LinkState = LinkState::new();
        let (mut d, log) = watched(&LINK, Watch(Some(&LINK)));

        LINK.control_out(Request::WriteUart, b"x").unwrap();
        d.step().unwrap();
        LINK.control_out(Request::SetGpio(GpioPattern::RUN), &[]).unwrap();
        d.step().unwrap();
        LINK.control_out(Request::SetBaudRate(BaudRate::Rom), &[]).unwrap();
        d.step().unwrap();

        let seen: Vec<DispatchState> = log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::State(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            seen,
            vec![
                DispatchState::ExecutingWrite,
                DispatchState::ExecutingGpio,
                DispatchState::ExecutingGpio,
                DispatchState::ExecutingBaud,
            ]
        );
        assert_eq!(d.state(), DispatchState::Idle);
    }
}

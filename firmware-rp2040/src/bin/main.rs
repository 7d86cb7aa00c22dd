#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::{UART1, USB};
use embassy_rp::uart::{Async, Config as UartConfig, Uart, UartRx};
use embassy_rp::usb::Driver;
use embassy_time::{Delay, Timer};
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use strap_uart_rp2040::bridge_proto::{BaudRate, MANUFACTURER, PRODUCT, PRODUCT_ID, VENDOR_ID};
use strap_uart_rp2040::{
    configure_vendor_interface, BridgeUart, Dispatcher, LinkState, SharedPin, StrapPins,
    VendorHandler, HEARTBEAT_MS,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Mailbox, receive ring and busy flag shared by every task.
static LINK: LinkState = LinkState::new();

/// Target reset line, driven by the main loop and by the USB handler.
static RESET_LINE: SharedPin<Output<'static>> = SharedPin::new();

/// Runs the USB and UART receive tasks above the main loop.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

static VENDOR_HANDLER: StaticCell<VendorHandler> = StaticCell::new();

const STARTUP_BLINKS: usize = 3;

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("strap-uart starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Strapping pins: target held in reset until the host says otherwise ---
    RESET_LINE.install(Output::new(p.PIN_3, Level::Low));
    let mut pins = StrapPins::new(
        Output::new(p.PIN_2, Level::Low),
        &RESET_LINE,
        Output::new(p.PIN_4, Level::Low),
    );
    if let Err(e) = pins.hold_all_low() {
        error!("Strap init failed: {}", e);
    }

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BaudRate::POWER_ON.bits_per_second();

    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    let (tx, rx) = uart.split();

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(VENDOR_ID, PRODUCT_ID);
    usb_config.manufacturer = Some(MANUFACTURER);
    usb_config.product = Some(PRODUCT);
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    let handler = VENDOR_HANDLER.init(VendorHandler::new(&LINK, &RESET_LINE));
    configure_vendor_interface(&mut builder, handler);

    let usb_device = builder.build();

    // --- High-priority tasks ---
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high.spawn(usb_task(usb_device).unwrap());
    high.spawn(uart_rx_task(rx).unwrap());

    // --- Main loop ---
    let mut led = Output::new(p.PIN_25, Level::Low);
    for _ in 0..STARTUP_BLINKS {
        led.set_high();
        Timer::after_millis(100).await;
        led.set_low();
        Timer::after_millis(100).await;
    }

    let mut dispatcher = Dispatcher::new(&LINK, BridgeUart::new(tx), pins, Delay);
    if let Err(e) = dispatcher.greet() {
        warn!("Greeting failed: {}", e);
    }

    info!("strap-uart initialized, waiting for commands...");

    loop {
        match select(LINK.mailbox().wait(), Timer::after_millis(HEARTBEAT_MS)).await {
            Either::First(command) => {
                if let Err(e) = dispatcher.execute(command) {
                    error!("{} failed: {}", command, e);
                }
            }
            Either::Second(()) => led.toggle(),
        }
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// UART receive task - moves every received byte into the receive ring.
#[embassy_executor::task]
async fn uart_rx_task(mut rx: UartRx<'static, Async>) {
    let mut byte = [0u8; 1];
    loop {
        match rx.read(&mut byte).await {
            Ok(()) => LINK.uart_received(byte[0]),
            Err(e) => warn!("UART receive error: {:?}", e),
        }
    }
}

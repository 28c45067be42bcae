//! FM Tuner Main Application
//!
//! Entry point for the STM32G474-based FM receiver firmware.
//! Initializes hardware, brings up the RDA5807 and spawns the control loop
//! and the USB remote-control tasks.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::select;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::USB;
use embassy_stm32::time::Hertz;
use embassy_stm32::usb::{self as stm32_usb, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Delay, Timer};
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, UsbDevice};
use heapless::{String, Vec};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use fm_tuner_firmware::drivers::button::ButtonPanel;
use fm_tuner_firmware::drivers::rda5807::Rda5807;
use fm_tuner_firmware::hal::gpio::{LedState, StatusLed};
use fm_tuner_firmware::prelude::*;
use fm_tuner_firmware::protocol::{self, ResponseLine};
use fm_tuner_firmware::radio::session::{RadioSession, Startup};
use fm_tuner_firmware::radio::stations::StationTable;
use fm_tuner_firmware::usb::cdc::{CdcReadBuffer, CdcWriteBuffer};

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    USB_LP => stm32_usb::InterruptHandler<peripherals::USB>;
});

type Bus = I2c<'static, Blocking>;
type Session = RadioSession<Bus, Delay>;
type UsbDriver = Driver<'static, USB>;
type CommandLine = String<COMMAND_LINE_LEN>;

/// Lines received from the remote host, consumed by the control loop
static COMMANDS: Channel<CriticalSectionRawMutex, CommandLine, 4> = Channel::new();

/// Lines for the remote host, produced by the control loop
static RESPONSES: Channel<CriticalSectionRawMutex, ResponseLine, 8> = Channel::new();

/// A host has the CDC port open
static CONNECTED: AtomicBool = AtomicBool::new(false);

static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("FM Tuner Firmware v{}", env!("CARGO_PKG_VERSION"));

    // USB needs the 48 MHz clock, taken from HSI48 trimmed by SOF
    let mut config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::{mux, Hsi48Config};
        config.rcc.hsi48 = Some(Hsi48Config { sync_from_usb: true });
        config.rcc.mux.clk48sel = mux::Clk48sel::HSI48;
    }
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized");

    let led = StatusLed::new(Output::new(p.PA5, Level::Low, Speed::Low));

    // PB8 = SCL, PB9 = SDA for I2C1 on STM32G474
    let i2c = I2c::new_blocking(
        p.I2C1,
        p.PB8,
        p.PB9,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );

    let mut tuner = Rda5807::new(i2c, Delay);
    if let Err(e) = tuner.init() {
        error!("Tuner init failed: {}", e);
        halt(led).await;
    }

    let mut session = RadioSession::new(tuner, StationTable::japan_kanto());
    if let Err(e) = session.start(&Startup::default()) {
        warn!("Startup settings incomplete: {}", e);
    }
    info!(
        "Tuned {} ({}), {}",
        session.frequency(),
        session.station_name(),
        session.volume()
    );

    let buttons = ButtonPanel::new(
        Input::new(p.PC0, Pull::Up),
        Input::new(p.PC1, Pull::Up),
        Input::new(p.PC2, Pull::Up),
        Input::new(p.PC3, Pull::Up),
    );

    // USB CDC ACM for remote control
    let driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);
    let mut usb_config = embassy_usb::Config::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("FM Radio Project");
    usb_config.product = Some("FM Tuner Remote");
    usb_config.serial_number = Some("0001");
    usb_config.max_power = 100;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(
        &mut builder,
        CDC_STATE.init(State::new()),
        USB_CDC_PACKET_SIZE,
    );
    let usb = builder.build();

    info!("USB initialized");

    spawner.spawn(usb_task(usb)).unwrap();
    spawner.spawn(cdc_task(class)).unwrap();
    spawner.spawn(radio_task(session, buttons, led)).unwrap();

    info!("Tasks spawned");
}

/// Tuner missing: never configure anything, blink the LED fast forever
async fn halt(mut led: StatusLed<Output<'static>>) -> ! {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(250)).await;
    }
}

/// Control loop: buttons, one remote command, RSSI and status per tick
#[embassy_executor::task]
async fn radio_task(
    mut session: Session,
    mut buttons: ButtonPanel<Input<'static>>,
    mut led: StatusLed<Output<'static>>,
) {
    let mut responses: Vec<ResponseLine, 8> = Vec::new();

    loop {
        // Tune and seek block on I2C polling for up to SEEK_TIMEOUT_MS; no
        // other task (USB included) runs until they return
        for button in buttons.poll() {
            if let Err(e) = session.on_button(button) {
                warn!("{} failed: {}", button, e);
            }
        }

        if let Ok(line) = COMMANDS.try_receive() {
            info!("remote: {}", line.as_str());
            // Same blocking bound as the buttons for remote tune/seek
            protocol::dispatch(&mut session, &line, &mut responses);
        }

        if let Err(e) = session.refresh_signal() {
            warn!("RSSI read failed: {}", e);
        }

        session.set_connected(CONNECTED.load(Ordering::Relaxed));
        led.set(LedState::from(session.is_connected()));

        if session.take_dirty() {
            info!(
                "{} MHz {} {} {}",
                session.frequency(),
                session.volume(),
                session.rssi(),
                session.station_name()
            );
            match session.tuner_mut().status() {
                Ok(status) => {
                    let _ = responses.push(protocol::status_line(&status));
                }
                Err(e) => warn!("status read failed: {}", e),
            }
        }

        if session.is_connected() {
            for line in &responses {
                if RESPONSES.try_send(line.clone()).is_err() {
                    warn!("response queue full");
                    break;
                }
            }
        }
        responses.clear();

        Timer::after(Duration::from_millis(CONTROL_TICK_MS)).await;
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

/// Moves lines between the CDC endpoints and the command/response channels
#[embassy_executor::task]
async fn cdc_task(class: CdcAcmClass<'static, UsbDriver>) {
    let (mut sender, mut receiver) = class.split();

    loop {
        receiver.wait_connection().await;
        CONNECTED.store(true, Ordering::Relaxed);
        info!("Remote host connected");

        let _ = select(read_commands(&mut receiver), write_responses(&mut sender)).await;

        CONNECTED.store(false, Ordering::Relaxed);
        info!("Remote host disconnected");
    }
}

async fn read_commands(receiver: &mut Receiver<'static, UsbDriver>) -> Result<(), EndpointError> {
    let mut rx = CdcReadBuffer::new();
    let mut packet = [0u8; USB_CDC_PACKET_SIZE as usize];

    loop {
        let n = receiver.read_packet(&mut packet).await?;
        let mut data = &packet[..n];

        loop {
            let taken = rx.push(data);
            data = &data[taken..];

            while let Some(line) = rx.read_line() {
                if line.is_empty() {
                    continue;
                }
                let mut command = CommandLine::new();
                // Non-UTF-8 input becomes an unknown command
                let _ = command.push_str(core::str::from_utf8(&line).unwrap_or("\u{1}"));
                COMMANDS.send(command).await;
            }

            if data.is_empty() {
                break;
            }
        }
    }
}

async fn write_responses(sender: &mut Sender<'static, UsbDriver>) -> Result<(), EndpointError> {
    let mut tx = CdcWriteBuffer::new();
    let packet_size = usize::from(USB_CDC_PACKET_SIZE);

    loop {
        let line = RESPONSES.receive().await;
        tx.clear();
        tx.write_line(&line);

        for chunk in tx.as_bytes().chunks(packet_size) {
            sender.write_packet(chunk).await?;
        }
        // A full last packet needs a zero-length packet to end the transfer
        if tx.len() % packet_size == 0 {
            sender.write_packet(&[]).await?;
        }
    }
}

//! Slatwise - Window Covering Actuator Firmware
//!
//! Main firmware binary for RP2040-based tilt actuators. A servo turns the
//! slat shaft, a quadrature sensor on the shaft tracks it, and a second
//! quadrature "wand" lets the operator turn the slats by hand. A UART link
//! to a messaging coprocessor carries remote moves and calibration.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::Pwm;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::{Delay, Instant, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use slatwise_core::calibration::CalibrationProtocol;
use slatwise_core::motion::MotionController;
use slatwise_drivers::motor::ServoMotor;
use slatwise_hal_rp2040::flash::Rp2040FlashStorage;
use slatwise_hal_rp2040::servo_pwm::{servo_config, slice_timing, SYS_CLK_HZ};

use crate::channels::{profile_snapshot, PRIMARY_SENSOR, SECONDARY_SENSOR};

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Slatwise firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Servo on GPIO16 (PWM slice 0, channel A), supply switch on GPIO17
    let timing = unwrap!(slice_timing(SYS_CLK_HZ, config::SERVO_FRAME_HZ));
    let pwm = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, servo_config(timing));
    let (servo_pwm, _) = pwm.split();
    let power_off = if config::SERVO_POWER_ACTIVE_HIGH {
        Level::Low
    } else {
        Level::High
    };
    let power = Output::new(p.PIN_17, power_off);
    let servo = unwrap!(ServoMotor::new(
        unwrap!(servo_pwm),
        power,
        config::servo_config()
    ));
    info!(
        "Servo initialized: divider={}, top={}",
        timing.divider, timing.top
    );

    // Restore profile and position before any edge is handled
    let flash = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH0);
    let mut controller = MotionController::new(
        config::motion_config(),
        servo,
        flash,
        Delay,
        &PRIMARY_SENSOR,
        &SECONDARY_SENSOR,
    );
    if let Err(e) = controller.init(Instant::now().as_millis()).await {
        warn!("Failed to restore last position: {:?}", e);
    }
    info!(
        "Boot state: calibrated={}, position={}",
        controller.profile().is_calibrated(),
        PRIMARY_SENSOR.position()
    );

    // Primary encoder on GPIO2/3, wand on GPIO4/5
    let pull = if config::SENSOR_PULL_UP {
        Pull::Up
    } else {
        Pull::None
    };
    let primary_a = Input::new(p.PIN_2, pull);
    let primary_b = Input::new(p.PIN_3, pull);
    let secondary_a = Input::new(p.PIN_4, pull);
    let secondary_b = Input::new(p.PIN_5, pull);

    // Link to the messaging coprocessor on UART0 (GPIO0 TX, GPIO1 RX)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config::LINK_BAUD_RATE;

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for link communication");

    // Spawn tasks
    spawner
        .spawn(tasks::control_task(
            controller,
            CalibrationProtocol::new(config::TARGET_ID),
        ))
        .unwrap();
    spawner
        .spawn(tasks::sensor_task(&PRIMARY_SENSOR, primary_a, primary_b))
        .unwrap();
    spawner
        .spawn(tasks::sensor_task(&SECONDARY_SENSOR, secondary_a, secondary_b))
        .unwrap();
    spawner.spawn(tasks::link_rx_task(rx)).unwrap();
    spawner.spawn(tasks::link_tx_task(tx)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        let profile = profile_snapshot();
        trace!(
            "Heartbeat: calibrated={}, bounds={}..{}, position={}",
            profile.is_calibrated(),
            profile.bottom_ticks(),
            profile.top_ticks(),
            PRIMARY_SENSOR.position()
        );
    }
}

// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Gas detection node built around an MQ2 gas sensor and an SHT30
//! temperature/humidity sensor.
//!
//! Every cycle the node averages the MQ2 analog output, converts it to a
//! calibrated voltage, reads the MQ2 digital threshold output, runs an SHT30
//! single shot measurement over I2C and sounds the buzzer while gas is
//! detected. One status line per phase is written to a serial-like output:
//!
//! ```text
//! LED_OFF | NORMAL. ADC:  55 | Volt:0.40V | DO:1 | BEEP:OFF | Temp:23.4 C | Humi:45.6%
//! LED_ON  | GAS! ADC: 812 | Volt:5.00V | DO:0 | BEEP:ON | Temp:23.4 C | Humi:45.6%
//! ```
//!
//! A failed SHT30 exchange never stops a cycle: its values are reported as
//! `-99.9` ([`sht30::SENTINEL`]).
//!
//! Hardware is reached through `embedded-hal` traits (GPIO, delay, I2C) and
//! the [`mq2::AnalogConverter`] and [`bus::Bus`] traits of this crate. With the
//! `linux` feature (default) the [`linux`] module provides an i2c-dev bus and
//! a thread sleep delay.
//!
//! ## Basic Example
//!
//! Running the detection loop
//!
//!```no_run
//!use gas_node::actuation::Actuators;
//!use gas_node::config::{CycleConfig, Sht30Config};
//!use gas_node::linux::{LinuxBus, ThreadDelay};
//!use gas_node::mq2::Mq2;
//!use gas_node::node::GasDetectionNode;
//!use gas_node::sht30::Sht30;
//!# use std::convert::Infallible;
//!# use std::time::Duration;
//!# use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
//!# use gas_node::mq2::{AnalogConverter, ConversionTimeout};
//!# struct Adc;
//!# struct Line;
//!# impl AnalogConverter for Adc {
//!#     fn start(&mut self) {}
//!#     fn poll_for_conversion(&mut self, _: Duration) -> Result<(), ConversionTimeout> { Ok(()) }
//!#     fn value(&mut self) -> u16 { 0 }
//!#     fn stop(&mut self) {}
//!# }
//!# impl ErrorType for Line { type Error = Infallible; }
//!# impl InputPin for Line {
//!#     fn is_high(&mut self) -> Result<bool, Infallible> { Ok(true) }
//!#     fn is_low(&mut self) -> Result<bool, Infallible> { Ok(false) }
//!# }
//!# impl OutputPin for Line {
//!#     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//!#     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//!# }
//!# fn board() -> (Adc, Line, Line, Line) { (Adc, Line, Line, Line) }
//!
//!fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    // Board specific converter and GPIO lines
//!    let (adc, digital_out, buzzer, led) = board();
//!
//!    let bus = LinuxBus::new(Sht30Config::DEFAULT_ADDRESS)?;
//!    let mut node = GasDetectionNode::init(
//!        Mq2::new(adc, digital_out),
//!        Sht30::new(bus),
//!        Actuators::new(buzzer, led),
//!        ThreadDelay,
//!        std::io::stdout(),
//!        CycleConfig::default(),
//!    );
//!
//!    loop {
//!        // faults are already logged, keep the alarm running
//!        if let Err(e) = node.run_cycle() {
//!            log::debug!("cycle finished with a fault: {}", e);
//!        }
//!    }
//!}
//!```
//!

/// Buzzer and LED outputs
pub mod actuation;
/// Bus transaction trait and `embedded-hal` I2C adapter
pub mod bus;
/// AO voltage calibration
pub mod calibration;
/// Static configuration and defaults
pub mod config;
/// Linux i2c-dev bus and thread delay
#[cfg(feature = "linux")]
pub mod linux;
/// MQ2 gas sensor acquisition
pub mod mq2;
/// Detection cycle
pub mod node;
/// SHT30 temperature and humidity acquisition
pub mod sht30;

pub use actuation::Actuators;
pub use bus::{Bus, BusFault, HalBus};
pub use calibration::{Calibration, CalibrationError, CalibrationReport};
pub use mq2::{AnalogConverter, ConversionTimeout, GasState, Mq2};
pub use node::{GasDetectionNode, LedPhase, NodeError, StatusLine};
pub use sht30::{Reading, Sht30, Sht30Error};

// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! SHT30 single shot temperature and humidity measurement.
//!
//! Exchange taken from the [datasheet](https://sensirion.com/media/documents/213E6A3B/63A5A569/Datasheet_SHT3x_DIS.pdf):
//! a 2 byte measurement command, a conversion wait, then a 6 byte response
//! made of two big-endian words each followed by its CRC-8.

use crate::bus::{Bus, BusFault};
use crate::config::{millis, Sht30Config};
use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};
use std::fmt;
use thiserror::Error;

/// Value reported for a temperature or humidity that could not be acquired.
pub const SENTINEL: f32 = -99.9;

pub const TEMPERATURE_MIN: f32 = -45.0;
pub const TEMPERATURE_MAX: f32 = 125.0;
pub const HUMIDITY_MIN: f32 = 0.0;
pub const HUMIDITY_MAX: f32 = 100.0;

///
/// SHT30 error enum. Transmit when the measurement command could not
/// be sent within the allowed attempts, Receive when the response could
/// not be read. Both carry the status of the last attempt.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Sht30Error {
    #[error("send command failed after {attempts} attempts (status: {last})")]
    Transmit { attempts: u8, last: BusFault },
    #[error("read data failed after {attempts} attempts (status: {last})")]
    Receive { attempts: u8, last: BusFault },
}

/// Temperature and humidity of one measurement.
///
/// Each field holds either a value inside its physical range or
/// [`SENTINEL`]; the two fields are validated independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Percent relative humidity
    pub humidity: f32,
}

impl Reading {
    /// Reading of a failed exchange.
    pub const UNAVAILABLE: Reading = Reading {
        temperature: SENTINEL,
        humidity: SENTINEL,
    };

    /// Decode a response frame, ignoring the checksum bytes.
    pub fn from_frame(frame: &[u8; 6]) -> Reading {
        let temperature_raw = u16::from_be_bytes([frame[0], frame[1]]);
        let humidity_raw = u16::from_be_bytes([frame[3], frame[4]]);
        Reading {
            temperature: guard(
                convert_temperature(temperature_raw),
                TEMPERATURE_MIN,
                TEMPERATURE_MAX,
            ),
            humidity: guard(convert_humidity(humidity_raw), HUMIDITY_MIN, HUMIDITY_MAX),
        }
    }

    /// Decode a response frame, resetting each field whose word fails
    /// its checksum.
    pub fn from_checked_frame(frame: &[u8; 6]) -> Reading {
        let mut reading = Reading::from_frame(frame);
        if !word_is_valid(&frame[0..3]) {
            warn!("SHT30: temperature checksum mismatch");
            reading.temperature = SENTINEL;
        }
        if !word_is_valid(&frame[3..6]) {
            warn!("SHT30: humidity checksum mismatch");
            reading.humidity = SENTINEL;
        }
        reading
    }

    /// Temperature in degrees Celsius, `None` when unavailable.
    pub fn temperature(&self) -> Option<f32> {
        valid(self.temperature)
    }

    /// Relative humidity in percent, `None` when unavailable.
    pub fn humidity(&self) -> Option<f32> {
        valid(self.humidity)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Temp:{:.1} C | Humi:{:.1}%", self.temperature, self.humidity)
    }
}

fn valid(value: f32) -> Option<f32> {
    if value == SENTINEL {
        None
    } else {
        Some(value)
    }
}

fn guard(value: f32, min: f32, max: f32) -> f32 {
    if (min..=max).contains(&value) {
        value
    } else {
        SENTINEL
    }
}

/// Degrees Celsius of a raw temperature word.
pub fn convert_temperature(raw: u16) -> f32 {
    -45.0 + 175.0 * raw as f32 / 65535.0
}

/// Percent relative humidity of a raw humidity word.
pub fn convert_humidity(raw: u16) -> f32 {
    100.0 * raw as f32 / 65535.0
}

/// Sensirion CRC-8: polynomial 0x31, initialization 0xFF, no final xor.
/// More info regarding the [algorithm](https://en.wikipedia.org/wiki/Computation_of_cyclic_redundancy_checks)
///
pub fn crc8(message: &[u8]) -> u8 {
    let polynomial = 0x31;
    let mut rem: u8 = 0xFF;
    for byte in message {
        rem ^= byte;
        for _ in 0..8 {
            if (rem & 0x80) != 0 {
                rem = (rem << 1) ^ polynomial;
            } else {
                rem <<= 1;
            }
        }
    }
    rem
}

/// Checks a 3 byte word: two data bytes then their checksum
fn word_is_valid(word: &[u8]) -> bool {
    crc8(&word[0..2]) == word[2]
}

/// SHT30 Struct, wraps a [`Bus`] and runs
/// the measurement exchange on it
///
pub struct Sht30<B> {
    bus: B,
    config: Sht30Config,
}

impl<B: Bus> Sht30<B> {
    /// Create an SHT30 with the default configuration (address 0x44,
    /// high repeatability, 3 attempts per phase)
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, Sht30Config::default())
    }

    /// Create an SHT30 with an explicit address, repeatability and retry policy.
    pub fn with_config(bus: B, config: Sht30Config) -> Self {
        Self { bus, config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &Sht30Config {
        &self.config
    }

    /// Give the bus back.
    pub fn release(self) -> B {
        self.bus
    }

    /// Run one measurement.
    ///
    /// Sends the measurement command, waits for the conversion and reads the
    /// 6 byte response, each bus phase retried up to `attempts` times. If the
    /// command cannot be sent the read is not attempted.
    ///
    /// `Ok` only tells that both phases went through: a field may still be
    /// [`SENTINEL`] when it is out of range or fails its checksum.
    pub fn read<D: DelayNs>(&mut self, delay: &mut D) -> Result<Reading, Sht30Error> {
        let address = self.config.address;
        let timeout = self.config.bus_timeout;
        let command = self.config.repeatability.command().to_be_bytes();

        self.with_retry(delay, |bus| bus.transmit(address, &command, timeout))
            .map_err(|(attempts, last)| {
                warn!("SHT30: Send command failed! (Status: {})", last);
                Sht30Error::Transmit { attempts, last }
            })?;

        delay.delay_ms(millis(self.config.repeatability.conversion_wait()));

        let mut frame = [0u8; 6];
        self.with_retry(delay, |bus| bus.receive(address, &mut frame, timeout))
            .map_err(|(attempts, last)| {
                warn!("SHT30: Read data failed! (Status: {})", last);
                Sht30Error::Receive { attempts, last }
            })?;

        let reading = if self.config.verify_crc {
            Reading::from_checked_frame(&frame)
        } else {
            Reading::from_frame(&frame)
        };
        debug!("SHT30 frame: {:02x?}, {}", frame, reading);
        Ok(reading)
    }

    /// Run `transaction` until it succeeds or the attempts are used up,
    /// pausing `backoff` between two attempts.
    fn with_retry<D, F>(&mut self, delay: &mut D, mut transaction: F) -> Result<(), (u8, BusFault)>
    where
        D: DelayNs,
        F: FnMut(&mut B) -> Result<(), BusFault>,
    {
        let attempts = self.config.attempts.max(1);
        let mut attempt = 1;
        loop {
            match transaction(&mut self.bus) {
                Ok(()) => return Ok(()),
                Err(fault) => {
                    trace!("SHT30 attempt {}/{} failed: {}", attempt, attempts, fault);
                    if attempt == attempts {
                        return Err((attempts, fault));
                    }
                }
            }
            attempt += 1;
            delay.delay_ms(millis(self.config.backoff));
        }
    }
}

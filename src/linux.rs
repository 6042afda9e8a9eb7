// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Linux host implementations: i2c-dev bus and thread sleep delay.

use crate::bus::{classify_failure, Bus, BusFault};
use embedded_hal::delay::DelayNs;
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::trace;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Bus adapter usually exposing the sensor header
pub const DEFAULT_I2C_PATH: &str = "/dev/i2c-1";

/// [`Bus`] over a Linux i2c-dev adapter.
///
/// The kernel adapter bounds each transfer with its own timeout; a failure
/// reported after the requested `timeout` is classified as
/// [`BusFault::Timeout`].
pub struct LinuxBus {
    device: LinuxI2CDevice,
    address: u8,
}

impl LinuxBus {
    /// Open the adapter on standard path /dev/i2c-1, pointed at `address`.
    /// If fails, return an LinuxI2CError from i2cdev
    ///
    pub fn new(address: u8) -> Result<LinuxBus, LinuxI2CError> {
        Self::open(DEFAULT_I2C_PATH, address)
    }

    /// Open a sensor on another i2c-dev adapter, e.g. `/dev/i2c-0`.
    pub fn open<P: AsRef<Path>>(path: P, address: u8) -> Result<LinuxBus, LinuxI2CError> {
        let device = LinuxI2CDevice::new(path, u16::from(address))?;
        Ok(LinuxBus { device, address })
    }

    fn select(&mut self, address: u8) -> Result<(), BusFault> {
        if address != self.address {
            self.device
                .set_slave_address(u16::from(address))
                .map_err(|e| {
                    trace!("i2c-dev cannot select {:#04x}: {}", address, e);
                    BusFault::Error
                })?;
            self.address = address;
        }
        Ok(())
    }
}

impl Bus for LinuxBus {
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusFault> {
        self.select(address)?;
        let started = Instant::now();
        self.device.write(bytes).map_err(|e| {
            trace!("i2c-dev write to {:#04x} failed: {}", address, e);
            classify_failure(started, timeout)
        })
    }

    fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusFault> {
        self.select(address)?;
        let started = Instant::now();
        self.device.read(buffer).map_err(|e| {
            trace!("i2c-dev read from {:#04x} failed: {}", address, e);
            classify_failure(started, timeout)
        })
    }
}

/// Blocking delay sleeping the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Addressed request/response transactions on a shared two-wire bus.

use embedded_hal::i2c::{Error as _, I2c};
use log::trace;
use std::time::{Duration, Instant};
use thiserror::Error;

///
/// Non-ok status of a bus transaction. Timeout when the transaction
/// did not complete within its bound, Error for any other failure
/// (no acknowledge, arbitration loss, bus fault).
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusFault {
    #[error("bus timeout")]
    Timeout,
    #[error("bus error")]
    Error,
}

/// Master side of the bus.
///
/// Each call is one complete transaction, bounded by `timeout`.
pub trait Bus {
    /// Write `bytes` to the device at `address`.
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusFault>;

    /// Fill `buffer` from the device at `address`.
    fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusFault>;
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusFault> {
        (**self).transmit(address, bytes, timeout)
    }

    fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusFault> {
        (**self).receive(address, buffer, timeout)
    }
}

/// Classify a failed transaction: a blocking call that failed after
/// running for the whole bound counts as a timeout.
pub(crate) fn classify_failure(started: Instant, timeout: Duration) -> BusFault {
    if started.elapsed() >= timeout {
        BusFault::Timeout
    } else {
        BusFault::Error
    }
}

/// [`Bus`] over any `embedded-hal` I2C master.
///
/// `embedded-hal` transactions carry no timeout of their own; the HAL's bus
/// configuration bounds them and a failure reported after `timeout` is
/// classified as [`BusFault::Timeout`].
pub struct HalBus<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> HalBus<I2C> {
    /// Wrap an `embedded-hal` I2C master.
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Give the I2C master back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Bus for HalBus<I2C> {
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusFault> {
        let started = Instant::now();
        self.i2c.write(address, bytes).map_err(|e| {
            trace!("i2c write to {:#04x} failed: {:?}", address, e.kind());
            classify_failure(started, timeout)
        })
    }

    fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusFault> {
        let started = Instant::now();
        self.i2c.read(address, buffer).map_err(|e| {
            trace!("i2c read from {:#04x} failed: {:?}", address, e.kind());
            classify_failure(started, timeout)
        })
    }
}

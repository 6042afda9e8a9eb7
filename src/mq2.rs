// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! MQ2 gas sensor: averaged analog output (AO) and digital threshold (DO).

use crate::calibration::{Calibration, CalibrationError, CalibrationReport, ADC_MAX};
use crate::config::{millis, Mq2Config};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{trace, warn};
use std::fmt;
use std::time::Duration;

/// A conversion did not complete within its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionTimeout;

/// 12-bit analog converter the MQ2 AO line is wired to.
pub trait AnalogConverter {
    /// Start converting.
    fn start(&mut self);

    /// Block until a conversion completes, at most `timeout`.
    fn poll_for_conversion(&mut self, timeout: Duration) -> Result<(), ConversionTimeout>;

    /// Code of the last completed conversion.
    fn value(&mut self) -> u16;

    /// Stop converting.
    fn stop(&mut self);
}

impl<A: AnalogConverter + ?Sized> AnalogConverter for &mut A {
    fn start(&mut self) {
        (**self).start()
    }

    fn poll_for_conversion(&mut self, timeout: Duration) -> Result<(), ConversionTimeout> {
        (**self).poll_for_conversion(timeout)
    }

    fn value(&mut self) -> u16 {
        (**self).value()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// State of the MQ2 digital output. The comparator pulls DO low
/// when the gas concentration crosses the module threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasState {
    Detected,
    Normal,
}

impl GasState {
    /// DO is pulled low while the gas concentration is over the threshold.
    pub fn from_line_low(low: bool) -> GasState {
        if low {
            GasState::Detected
        } else {
            GasState::Normal
        }
    }

    /// Logical level of the DO line (0 = gas).
    pub fn level(self) -> u8 {
        match self {
            GasState::Detected => 0,
            GasState::Normal => 1,
        }
    }

    /// `true` for [`GasState::Detected`]
    pub fn is_detected(self) -> bool {
        self == GasState::Detected
    }
}

impl fmt::Display for GasState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GasState::Detected => f.write_str("GAS!"),
            GasState::Normal => f.write_str("NORMAL."),
        }
    }
}

/// MQ2 struct, owns the converter, the DO input and the voltage
/// calibration applied to AO readings
///
pub struct Mq2<ADC, DO> {
    adc: ADC,
    digital_out: DO,
    calibration: Calibration,
    config: Mq2Config,
}

impl<ADC, DO> Mq2<ADC, DO>
where
    ADC: AnalogConverter,
    DO: InputPin,
{
    /// Sensor with the default calibration and acquisition settings.
    pub fn new(adc: ADC, digital_out: DO) -> Self {
        Self::with_config(adc, digital_out, Calibration::DEFAULT, Mq2Config::default())
    }

    /// Sensor with an explicit calibration and acquisition settings.
    pub fn with_config(
        adc: ADC,
        digital_out: DO,
        calibration: Calibration,
        config: Mq2Config,
    ) -> Self {
        Self {
            adc,
            digital_out,
            calibration,
            config,
        }
    }

    /// Calibration in use for `convert_voltage`.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Replace the calibration, e.g. with a factor stored from an earlier run.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Re-derive the calibration factor from a multimeter reading of AO
    /// taken while the averaged converter code was `raw`.
    pub fn calibrate(
        &mut self,
        reference_volts: f32,
        raw: u16,
    ) -> Result<CalibrationReport, CalibrationError> {
        self.calibration.calibrate(reference_volts, raw)
    }

    /// Average of `samples` conversions of the AO line.
    ///
    /// Conversions that time out are skipped and the average is taken over
    /// the ones that completed; 0 when none did. Each conversion is followed
    /// by `sample_interval`.
    pub fn read_analog_averaged<D: DelayNs>(&mut self, delay: &mut D) -> u16 {
        let mut sum: u32 = 0;
        let mut completed: u32 = 0;

        self.adc.start();
        for i in 0..self.config.samples {
            match self.adc.poll_for_conversion(self.config.conversion_timeout) {
                Ok(()) => {
                    let value = self.adc.value().min(ADC_MAX);
                    trace!("MQ2 sample {}: {}", i, value);
                    sum += u32::from(value);
                    completed += 1;
                }
                Err(ConversionTimeout) => trace!("MQ2 sample {} timed out", i),
            }
            delay.delay_ms(millis(self.config.sample_interval));
        }
        self.adc.stop();

        if completed == 0 {
            warn!("MQ2: no conversion completed out of {}", self.config.samples);
            return 0;
        }
        if completed < u32::from(self.config.samples) {
            warn!(
                "MQ2: {} of {} conversions timed out",
                u32::from(self.config.samples) - completed,
                self.config.samples
            );
        }
        (sum / completed) as u16
    }

    /// Calibrated AO voltage of a converter code.
    pub fn convert_voltage(&self, raw: u16) -> f32 {
        self.calibration.convert_voltage(raw)
    }

    /// Instant read of the DO line, no debouncing.
    pub fn read_digital_state(&mut self) -> Result<GasState, DO::Error> {
        self.digital_out.is_low().map(GasState::from_line_low)
    }
}

// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Voltage calibration for the MQ2 analog output.
//!
//! The MQ2 AO line reaches the 12-bit converter through a resistor divider,
//! so the converter voltage has to be scaled back up. The scale factor is
//! owned by a [`Calibration`] value instead of living in a global, and it can
//! be re-derived at runtime from a multimeter reading.

use log::info;
use std::fmt;
use thiserror::Error;

/// Largest code the 12-bit converter produces.
pub const ADC_MAX: u16 = 4095;

/// Converter reference voltage.
pub const ADC_REFERENCE_VOLTS: f32 = 3.3;

/// Upper bound of a reported sensor voltage (MQ2 module supply).
pub const MAX_SENSOR_VOLTS: f32 = 5.0;

/// Factor measured on the reference board: 0.40V on the multimeter
/// against an averaged ADC code of 55.
pub const DEFAULT_FACTOR: f32 = 9.03;

///
/// Calibration error enum. ZeroReading when the ADC code used
/// for calibration is 0 (the factor would be infinite).
/// InvalidReference when the multimeter voltage is not a positive
/// finite number. InvalidFactor when a factor is set directly
/// and is not a positive finite number.
///
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalibrationError {
    #[error("cannot calibrate against an ADC reading of 0")]
    ZeroReading,
    #[error("reference voltage {0} V is not a positive finite value")]
    InvalidReference(f32),
    #[error("calibration factor {0} is not a positive finite value")]
    InvalidFactor(f32),
}

/// Values involved in a successful calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReport {
    /// ADC code the reference was taken against
    pub adc: u16,
    /// Voltage read on the multimeter
    pub reference_volts: f32,
    /// Voltage computed from the ADC code without any factor
    pub raw_volts: f32,
    /// Resulting factor
    pub factor: f32,
}

impl fmt::Display for CalibrationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "=== CALIBRATION ===")?;
        writeln!(f, "ADC: {}", self.adc)?;
        writeln!(f, "Multimeter: {:.3}V", self.reference_volts)?;
        writeln!(f, "Raw: {:.3}V", self.raw_volts)?;
        write!(f, "Factor: {:.2}", self.factor)
    }
}

/// Scale factor applied to converter voltages.
///
/// The factor is always a positive finite number: every way of changing it
/// validates the new value first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    factor: f32,
}

impl Calibration {
    /// Calibration with [`DEFAULT_FACTOR`]
    pub const DEFAULT: Calibration = Calibration {
        factor: DEFAULT_FACTOR,
    };

    /// Create a calibration with a known factor.
    pub fn new(factor: f32) -> Result<Calibration, CalibrationError> {
        if !is_positive_finite(factor) {
            return Err(CalibrationError::InvalidFactor(factor));
        }
        Ok(Calibration { factor })
    }

    /// Multiplier applied to the uncalibrated voltage.
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Voltage seen by the converter for a code, without the factor.
    pub fn uncalibrated_voltage(raw: u16) -> f32 {
        raw as f32 / ADC_MAX as f32 * ADC_REFERENCE_VOLTS
    }

    /// Convert an ADC code into the calibrated sensor voltage,
    /// clamped to [0.0, 5.0].
    pub fn convert_voltage(&self, raw: u16) -> f32 {
        let voltage = Self::uncalibrated_voltage(raw) * self.factor;
        voltage.clamp(0.0, MAX_SENSOR_VOLTS)
    }

    /// Derive the factor from a multimeter reading taken while the
    /// converter reported `raw`.
    ///
    /// On error the current factor is kept.
    pub fn calibrate(
        &mut self,
        reference_volts: f32,
        raw: u16,
    ) -> Result<CalibrationReport, CalibrationError> {
        if raw == 0 {
            return Err(CalibrationError::ZeroReading);
        }
        if !is_positive_finite(reference_volts) {
            return Err(CalibrationError::InvalidReference(reference_volts));
        }

        let raw_volts = Self::uncalibrated_voltage(raw);
        let factor = reference_volts / raw_volts;
        if !is_positive_finite(factor) {
            return Err(CalibrationError::InvalidFactor(factor));
        }
        self.factor = factor;

        let report = CalibrationReport {
            adc: raw,
            reference_volts,
            raw_volts,
            factor,
        };
        info!(
            "calibration: adc={} multimeter={:.3}V raw={:.3}V factor={:.2}",
            report.adc, report.reference_volts, report.raw_volts, report.factor
        );
        Ok(report)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn is_positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

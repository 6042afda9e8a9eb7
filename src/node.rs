// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Detection cycle: sample, actuate and report, once with the LED off
//! and once with it on.

use crate::actuation::{buzzer_for, Actuators};
use crate::bus::Bus;
use crate::calibration::{CalibrationError, CalibrationReport};
use crate::config::{millis, CycleConfig};
use crate::mq2::{AnalogConverter, GasState, Mq2};
use crate::sht30::{Reading, Sht30};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin};
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

/// Written once to the status output when the node starts.
pub const PREHEAT_ADVISORY: &str = "MQ2 preheating... Wait 2-3 mins!";

///
/// Node error enum. Pin when a GPIO line could not be read or driven,
/// Output when the status output refused a line, Calibration when a
/// calibration request was rejected. Sensor acquisition failures are
/// not errors at this level: they show up as sentinel values.
///
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("GPIO fault: {0:?}")]
    Pin(ErrorKind),
    #[error("status output failed: {0}")]
    Output(#[from] io::Error),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

impl From<ErrorKind> for NodeError {
    fn from(kind: ErrorKind) -> Self {
        NodeError::Pin(kind)
    }
}

/// Log a fault without stopping the caller and hand it back.
fn check<E: Into<NodeError>>(what: &str, result: Result<(), E>) -> Option<NodeError> {
    let e = result.err()?.into();
    warn!("{}: {}", what, e);
    Some(e)
}

/// LED state commanded for one half of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPhase {
    Off,
    On,
}

impl LedPhase {
    /// LED command of the phase
    pub fn is_on(self) -> bool {
        self == LedPhase::On
    }
}

impl fmt::Display for LedPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedPhase::Off => f.write_str("LED_OFF"),
            LedPhase::On => f.write_str("LED_ON "),
        }
    }
}

/// Everything one phase measured and commanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    pub phase: LedPhase,
    pub gas: GasState,
    /// Averaged converter code
    pub adc: u16,
    /// Calibrated AO voltage
    pub voltage: f32,
    /// Buzzer command
    pub buzzer: bool,
    pub reading: Reading,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} | {} ADC:{:4} | Volt:{:.2}V | DO:{} | BEEP:{} | {}",
            self.phase,
            self.gas,
            self.adc,
            self.voltage,
            self.gas.level(),
            if self.buzzer { "ON" } else { "OFF" },
            self.reading
        )
    }
}

/// Gas detection node.
///
/// Owns the sensors, the outputs, the delay and the status output. Building
/// one with [`GasDetectionNode::init`] runs the start-up sequence, so the
/// preheat advisory is written once per node.
pub struct GasDetectionNode<ADC, DO, B, BUZ, LED, D, W> {
    mq2: Mq2<ADC, DO>,
    sht30: Sht30<B>,
    actuators: Actuators<BUZ, LED>,
    delay: D,
    out: W,
    config: CycleConfig,
}

impl<ADC, DO, B, BUZ, LED, D, W> GasDetectionNode<ADC, DO, B, BUZ, LED, D, W>
where
    ADC: AnalogConverter,
    DO: InputPin,
    B: Bus,
    BUZ: OutputPin,
    LED: OutputPin,
    D: DelayNs,
    W: Write,
{
    /// Start the node: write the preheat advisory, give the operator
    /// `preheat_notice_delay` to read it, then switch buzzer and LED off.
    ///
    /// Output and GPIO faults are logged and start-up carries on, so a
    /// broken LED or serial line never keeps the alarm from running.
    pub fn init(
        mq2: Mq2<ADC, DO>,
        sht30: Sht30<B>,
        actuators: Actuators<BUZ, LED>,
        delay: D,
        out: W,
        config: CycleConfig,
    ) -> Self {
        let mut node = Self {
            mq2,
            sht30,
            actuators,
            delay,
            out,
            config,
        };

        check("status output", write!(node.out, "{}\r\n", PREHEAT_ADVISORY));
        info!("{}", PREHEAT_ADVISORY);
        node.delay.delay_ms(millis(node.config.preheat_notice_delay));

        check("buzzer line", node.actuators.set_buzzer(false));
        check("LED line", node.actuators.set_led(false));
        node
    }

    /// One full cycle: the LED off phase then the LED on phase.
    ///
    /// Both phases always run; the first fault of the cycle is returned
    /// once they are done.
    pub fn run_cycle(&mut self) -> Result<[StatusLine; 2], NodeError> {
        let off = self.run_phase(LedPhase::Off);
        let on = self.run_phase(LedPhase::On);
        match (off, on) {
            (Ok(off), Ok(on)) => Ok([off, on]),
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    /// One phase: set the LED, sample both sensors, drive the buzzer,
    /// write the status line and wait `phase_delay`.
    ///
    /// A failed SHT30 exchange does not stop the phase; its fields are
    /// reported as sentinels. LED, DO, buzzer and status output faults are
    /// logged and the phase runs to the end, wait included, before the
    /// first of them is returned. An unreadable DO line counts as gas.
    pub fn run_phase(&mut self, phase: LedPhase) -> Result<StatusLine, NodeError> {
        let mut fault = check("LED line", self.actuators.set_led(phase.is_on()));

        let adc = self.mq2.read_analog_averaged(&mut self.delay);
        let voltage = self.mq2.convert_voltage(adc);
        let gas = match self.mq2.read_digital_state() {
            Ok(gas) => gas,
            Err(e) => {
                fault = fault.or(check("MQ2 DO line", Err(e.kind())));
                GasState::Detected
            }
        };
        // failures are logged by the driver
        let reading = self
            .sht30
            .read(&mut self.delay)
            .unwrap_or(Reading::UNAVAILABLE);

        let buzzer = buzzer_for(gas);
        fault = fault.or(check(
            "buzzer line",
            self.actuators.actuate(gas).map(|_| ()),
        ));

        let line = StatusLine {
            phase,
            gas,
            adc,
            voltage,
            buzzer,
            reading,
        };
        debug!("{:?}", line);
        fault = fault.or(check("status output", write!(self.out, "{}\r\n", line)));

        self.delay.delay_ms(millis(self.config.phase_delay));
        match fault {
            Some(e) => Err(e),
            None => Ok(line),
        }
    }

    /// Calibrate the AO voltage against a multimeter reading taken now:
    /// acquires an averaged code, derives the factor and writes the
    /// report to the status output.
    pub fn calibrate(&mut self, reference_volts: f32) -> Result<CalibrationReport, NodeError> {
        let raw = self.mq2.read_analog_averaged(&mut self.delay);
        let report = self.mq2.calibrate(reference_volts, raw)?;
        for line in report.to_string().lines() {
            write!(self.out, "{}\r\n", line)?;
        }
        Ok(report)
    }

    /// Gas sensor, for reading the calibration in use
    pub fn mq2(&self) -> &Mq2<ADC, DO> {
        &self.mq2
    }

    /// Gas sensor, for setting a known calibration
    pub fn mq2_mut(&mut self) -> &mut Mq2<ADC, DO> {
        &mut self.mq2
    }

    /// Temperature/humidity sensor
    pub fn sht30(&self) -> &Sht30<B> {
        &self.sht30
    }

    /// Status output, as written so far
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Tear the node down into its parts.
    #[allow(clippy::type_complexity)]
    pub fn release(self) -> (Mq2<ADC, DO>, Sht30<B>, Actuators<BUZ, LED>, D, W) {
        (self.mq2, self.sht30, self.actuators, self.delay, self.out)
    }
}

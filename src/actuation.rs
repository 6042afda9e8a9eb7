// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Buzzer and LED outputs.

use crate::config::ActiveLevel;
use crate::mq2::GasState;
use embedded_hal::digital::{Error as _, ErrorKind, OutputPin};

/// Buzzer command for a gas state: sounding exactly when gas is detected.
pub fn buzzer_for(state: GasState) -> bool {
    state.is_detected()
}

fn drive<P: OutputPin>(pin: &mut P, level: ActiveLevel, on: bool) -> Result<(), ErrorKind> {
    let high = match level {
        ActiveLevel::High => on,
        ActiveLevel::Low => !on,
    };
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| e.kind())
}

/// Buzzer and LED output lines with their active levels.
pub struct Actuators<BUZ, LED> {
    buzzer: BUZ,
    led: LED,
    buzzer_level: ActiveLevel,
    led_level: ActiveLevel,
}

impl<BUZ: OutputPin, LED: OutputPin> Actuators<BUZ, LED> {
    /// Both lines active-low, as on the reference board
    pub fn new(buzzer: BUZ, led: LED) -> Self {
        Self::with_levels(buzzer, led, ActiveLevel::Low, ActiveLevel::Low)
    }

    /// Lines with explicit active levels.
    pub fn with_levels(
        buzzer: BUZ,
        led: LED,
        buzzer_level: ActiveLevel,
        led_level: ActiveLevel,
    ) -> Self {
        Self {
            buzzer,
            led,
            buzzer_level,
            led_level,
        }
    }

    /// Switch the buzzer on or off.
    pub fn set_buzzer(&mut self, on: bool) -> Result<(), ErrorKind> {
        drive(&mut self.buzzer, self.buzzer_level, on)
    }

    /// Switch the LED on or off.
    pub fn set_led(&mut self, on: bool) -> Result<(), ErrorKind> {
        drive(&mut self.led, self.led_level, on)
    }

    /// Drive the buzzer from the gas state and return the command.
    pub fn actuate(&mut self, state: GasState) -> Result<bool, ErrorKind> {
        let on = buzzer_for(state);
        self.set_buzzer(on)?;
        Ok(on)
    }

    /// Give the output lines back.
    pub fn release(self) -> (BUZ, LED) {
        (self.buzzer, self.led)
    }
}

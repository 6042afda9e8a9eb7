// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Test doubles for the hardware seams. Every double appends to one shared
//! event log so tests can check the order of bus, GPIO and delay activity.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use gas_node::sht30::crc8;
use gas_node::{AnalogConverter, Bus, BusFault, ConversionTimeout};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Buzzer line driven, `true` = high
    Buzzer(bool),
    /// LED line driven, `true` = high
    Led(bool),
    /// Address, bytes and timeout of a write
    Transmit(u8, Vec<u8>, Duration),
    /// Address and timeout of a read
    Receive(u8, Duration),
    Delay(u32),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &Log, wanted: impl Fn(&Event) -> bool) -> usize {
    log.borrow().iter().filter(|e| wanted(e)).count()
}

/// Response frame with valid checksums.
pub fn frame(temperature_raw: u16, humidity_raw: u16) -> [u8; 6] {
    let [t0, t1] = temperature_raw.to_be_bytes();
    let [h0, h1] = humidity_raw.to_be_bytes();
    [t0, t1, crc8(&[t0, t1]), h0, h1, crc8(&[h0, h1])]
}

/// 25.0 C, 50.0 %
pub fn typical_frame() -> [u8; 6] {
    frame(0x6666, 0x8000)
}

/// Converter always completing with the same code.
pub struct FixedAdc {
    pub value: u16,
}

impl AnalogConverter for FixedAdc {
    fn start(&mut self) {}

    fn poll_for_conversion(&mut self, _timeout: Duration) -> Result<(), ConversionTimeout> {
        Ok(())
    }

    fn value(&mut self) -> u16 {
        self.value
    }

    fn stop(&mut self) {}
}

/// MQ2 DO line; the shared flag tells whether it is pulled low.
pub struct DoLine {
    pub low: Rc<Cell<bool>>,
}

impl ErrorType for DoLine {
    type Error = Infallible;
}

impl InputPin for DoLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.low.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.low.get())
    }
}

#[derive(Clone, Copy)]
pub enum Output {
    Buzzer,
    Led,
}

/// Fault of a GPIO line that no longer responds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFault;

impl digital::Error for LineFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output line recording every level it is driven to. A broken line
/// records nothing and fails every write.
pub struct OutputLine {
    pub output: Output,
    pub log: Log,
    pub broken: bool,
}

impl OutputLine {
    pub fn new(output: Output, log: &Log) -> Self {
        Self {
            output,
            log: log.clone(),
            broken: false,
        }
    }

    fn record(&self, high: bool) -> Result<(), LineFault> {
        if self.broken {
            return Err(LineFault);
        }
        let event = match self.output {
            Output::Buzzer => Event::Buzzer(high),
            Output::Led => Event::Led(high),
        };
        self.log.borrow_mut().push(event);
        Ok(())
    }
}

impl ErrorType for OutputLine {
    type Error = LineFault;
}

impl OutputPin for OutputLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true)
    }
}

/// Serial status output; while `down` is set every write fails.
pub struct SerialOut {
    pub buffer: Vec<u8>,
    pub down: Rc<Cell<bool>>,
}

impl Write for SerialOut {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.down.get() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "serial line down"));
        }
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Bus answering from scripts; once a script runs out every
/// transaction succeeds and reads return `frame`.
pub struct ScriptedBus {
    pub transmits: VecDeque<Result<(), BusFault>>,
    pub receives: VecDeque<Result<(), BusFault>>,
    pub frame: [u8; 6],
    pub log: Log,
}

impl ScriptedBus {
    pub fn healthy(log: &Log, frame: [u8; 6]) -> Self {
        Self {
            transmits: VecDeque::new(),
            receives: VecDeque::new(),
            frame,
            log: log.clone(),
        }
    }

    pub fn failing_transmit(log: &Log, fault: BusFault) -> Self {
        let mut bus = Self::healthy(log, typical_frame());
        bus.transmits = VecDeque::from(vec![Err(fault); 64]);
        bus
    }
}

impl Bus for ScriptedBus {
    fn transmit(&mut self, address: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusFault> {
        self.log
            .borrow_mut()
            .push(Event::Transmit(address, bytes.to_vec(), timeout));
        self.transmits.pop_front().unwrap_or(Ok(()))
    }

    fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusFault> {
        self.log.borrow_mut().push(Event::Receive(address, timeout));
        self.receives.pop_front().unwrap_or(Ok(()))?;
        buffer.copy_from_slice(&self.frame[..buffer.len()]);
        Ok(())
    }
}

pub struct RecordingDelay {
    pub log: Log,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log
            .borrow_mut()
            .push(Event::Delay(ns.div_ceil(1_000_000)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Delay(ms));
    }
}

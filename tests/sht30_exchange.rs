// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use common::{count, frame, new_log, typical_frame, Event, RecordingDelay, ScriptedBus};
use gas_node::config::{Repeatability, Sht30Config};
use gas_node::sht30::SENTINEL;
use gas_node::{BusFault, Sht30, Sht30Error};
use std::collections::VecDeque;
use std::time::Duration;

const BUS_TIMEOUT: Duration = Duration::from_millis(500);

#[test]
fn measurement_exchange() {
    let log = new_log();
    let mut sht = Sht30::new(ScriptedBus::healthy(&log, typical_frame()));
    let mut delay = RecordingDelay { log: log.clone() };

    let reading = sht.read(&mut delay).unwrap();

    assert!((reading.temperature - 25.0).abs() < 0.01);
    assert!((reading.humidity - 50.0).abs() < 0.01);
    assert_eq!(
        *log.borrow(),
        vec![
            Event::Transmit(0x44, vec![0x2C, 0x06], BUS_TIMEOUT),
            Event::Delay(20),
            Event::Receive(0x44, BUS_TIMEOUT),
        ]
    );
}

#[test]
fn send_failure_skips_the_read() {
    let log = new_log();
    let mut sht = Sht30::new(ScriptedBus::failing_transmit(&log, BusFault::Timeout));
    let mut delay = RecordingDelay { log: log.clone() };

    let result = sht.read(&mut delay);

    assert_eq!(
        result,
        Err(Sht30Error::Transmit {
            attempts: 3,
            last: BusFault::Timeout
        })
    );
    assert_eq!(count(&log, |e| matches!(e, Event::Transmit(..))), 3);
    assert_eq!(count(&log, |e| matches!(e, Event::Receive(..))), 0);
    // backoff only between attempts
    assert_eq!(count(&log, |e| *e == Event::Delay(50)), 2);
    assert_eq!(count(&log, |e| *e == Event::Delay(20)), 0);
}

#[test]
fn send_recovers_on_last_attempt() {
    let log = new_log();
    let mut bus = ScriptedBus::healthy(&log, typical_frame());
    bus.transmits = VecDeque::from(vec![Err(BusFault::Error), Err(BusFault::Timeout)]);
    let mut sht = Sht30::new(bus);

    let reading = sht.read(&mut RecordingDelay { log: log.clone() }).unwrap();

    assert!(reading.temperature().is_some());
    assert_eq!(count(&log, |e| matches!(e, Event::Transmit(..))), 3);
    assert_eq!(count(&log, |e| matches!(e, Event::Receive(..))), 1);
}

#[test]
fn read_failure_reports_last_status() {
    let log = new_log();
    let mut bus = ScriptedBus::healthy(&log, typical_frame());
    bus.receives = VecDeque::from(vec![
        Err(BusFault::Timeout),
        Err(BusFault::Timeout),
        Err(BusFault::Error),
    ]);
    let mut sht = Sht30::new(bus);

    let result = sht.read(&mut RecordingDelay { log: log.clone() });

    assert_eq!(
        result,
        Err(Sht30Error::Receive {
            attempts: 3,
            last: BusFault::Error
        })
    );
    assert_eq!(count(&log, |e| matches!(e, Event::Transmit(..))), 1);
    assert_eq!(count(&log, |e| matches!(e, Event::Receive(..))), 3);
    // one conversion wait, then backoff only between read attempts
    assert_eq!(count(&log, |e| *e == Event::Delay(20)), 1);
    assert_eq!(count(&log, |e| *e == Event::Delay(50)), 2);
    assert_eq!(log.borrow().last(), Some(&Event::Receive(0x44, BUS_TIMEOUT)));
}

#[test]
fn out_of_range_temperature_keeps_humidity() {
    let log = new_log();
    let mut sht = Sht30::new(ScriptedBus::healthy(&log, frame(0xFFFF, 0xFFFF)));

    let reading = sht.read(&mut RecordingDelay { log: log.clone() }).unwrap();

    assert_eq!(reading.temperature, SENTINEL);
    assert_eq!(reading.humidity, 100.0);
}

#[test]
fn corrupted_word_is_reset_when_checked() {
    let log = new_log();
    let mut corrupted = typical_frame();
    corrupted[2] ^= 0x01;

    let mut checked = Sht30::new(ScriptedBus::healthy(&log, corrupted));
    let reading = checked.read(&mut RecordingDelay { log: log.clone() }).unwrap();
    assert_eq!(reading.temperature, SENTINEL);
    assert!(reading.humidity().is_some());

    let config = Sht30Config {
        verify_crc: false,
        ..Sht30Config::default()
    };
    let mut unchecked = Sht30::with_config(ScriptedBus::healthy(&log, corrupted), config);
    let reading = unchecked.read(&mut RecordingDelay { log: log.clone() }).unwrap();
    assert!(reading.temperature().is_some());
}

#[test]
fn configured_address_and_repeatability() {
    let log = new_log();
    let config = Sht30Config {
        address: Sht30Config::ALTERNATE_ADDRESS,
        repeatability: Repeatability::Medium,
        ..Sht30Config::default()
    };
    let mut sht = Sht30::with_config(ScriptedBus::healthy(&log, typical_frame()), config);

    sht.read(&mut RecordingDelay { log: log.clone() }).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            Event::Transmit(0x45, vec![0x2C, 0x0D], BUS_TIMEOUT),
            Event::Delay(10),
            Event::Receive(0x45, BUS_TIMEOUT),
        ]
    );
}

#[test]
fn configured_bus_timeout_bounds_every_transfer() {
    let log = new_log();
    let mut bus = ScriptedBus::healthy(&log, typical_frame());
    bus.transmits = VecDeque::from(vec![Err(BusFault::Timeout)]);
    bus.receives = VecDeque::from(vec![Err(BusFault::Timeout)]);
    let config = Sht30Config {
        bus_timeout: Duration::from_millis(120),
        ..Sht30Config::default()
    };
    let mut sht = Sht30::with_config(bus, config);

    sht.read(&mut RecordingDelay { log: log.clone() }).unwrap();

    let transfers: Vec<Duration> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Transmit(_, _, timeout) | Event::Receive(_, timeout) => Some(*timeout),
            _ => None,
        })
        .collect();
    assert_eq!(transfers, vec![Duration::from_millis(120); 4]);
}

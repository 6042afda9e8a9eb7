// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Static board configuration.
//!
//! Nothing here changes at runtime; the defaults describe the reference board.

use std::time::Duration;

/// Timing of the MQ2 analog acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mq2Config {
    /// Conversions averaged per reading
    pub samples: u8,
    /// Bound on each conversion wait
    pub conversion_timeout: Duration,
    /// Pause after each conversion
    pub sample_interval: Duration,
}

impl Mq2Config {
    pub const SAMPLES: u8 = 10;
    pub const CONVERSION_TIMEOUT: Duration = Duration::from_millis(100);
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);
}

impl Default for Mq2Config {
    fn default() -> Self {
        Self {
            samples: Self::SAMPLES,
            conversion_timeout: Self::CONVERSION_TIMEOUT,
            sample_interval: Self::SAMPLE_INTERVAL,
        }
    }
}

/// SHT30 single shot measurement repeatability (clock stretching enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeatability {
    #[default]
    High,
    Medium,
    Low,
}

impl Repeatability {
    /// Measurement command sent to the sensor
    pub const fn command(self) -> u16 {
        match self {
            Repeatability::High => 0x2C06,
            Repeatability::Medium => 0x2C0D,
            Repeatability::Low => 0x2C10,
        }
    }

    /// Wait between the command and the read. Datasheet maximums are
    /// 15ms, 6ms and 4ms.
    pub const fn conversion_wait(self) -> Duration {
        match self {
            Repeatability::High => Duration::from_millis(20),
            Repeatability::Medium | Repeatability::Low => Duration::from_millis(10),
        }
    }
}

/// Bus parameters of the SHT30 exchange
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sht30Config {
    /// 7-bit bus address
    pub address: u8,
    pub repeatability: Repeatability,
    /// Attempts per phase, the first one included
    pub attempts: u8,
    /// Pause between two attempts of the same phase
    pub backoff: Duration,
    /// Bound on each bus transaction
    pub bus_timeout: Duration,
    /// Check the CRC-8 of each received word
    pub verify_crc: bool,
}

impl Sht30Config {
    /// ADDR pin tied low (no ADDR line on the module)
    pub const DEFAULT_ADDRESS: u8 = 0x44;
    /// ADDR pin tied high
    pub const ALTERNATE_ADDRESS: u8 = 0x45;
    pub const ATTEMPTS: u8 = 3;
    pub const BACKOFF: Duration = Duration::from_millis(50);
    pub const BUS_TIMEOUT: Duration = Duration::from_millis(500);
}

impl Default for Sht30Config {
    fn default() -> Self {
        Self {
            address: Self::DEFAULT_ADDRESS,
            repeatability: Repeatability::High,
            attempts: Self::ATTEMPTS,
            backoff: Self::BACKOFF,
            bus_timeout: Self::BUS_TIMEOUT,
            verify_crc: true,
        }
    }
}

/// Output level that switches a buzzer or LED on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLevel {
    /// On when the line is driven low (reference board wiring)
    #[default]
    Low,
    High,
}

/// Timing of the detection cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleConfig {
    /// Pause after each LED phase
    pub phase_delay: Duration,
    /// Pause after the preheat advisory
    pub preheat_notice_delay: Duration,
}

impl CycleConfig {
    pub const PHASE_DELAY: Duration = Duration::from_millis(1000);
    pub const PREHEAT_NOTICE_DELAY: Duration = Duration::from_millis(1000);
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            phase_delay: Self::PHASE_DELAY,
            preheat_notice_delay: Self::PREHEAT_NOTICE_DELAY,
        }
    }
}

/// Milliseconds of a delay, saturated to what `DelayNs::delay_ms` accepts.
pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

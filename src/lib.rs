//! MQ135 CO2 sensor driver
//!
//! The library core turns 12-bit ADC readings into a CO2 estimate and
//! calibrates the sensor's RZero. It talks to hardware only through the
//! [`sampler::AnalogSampler`] and [`cooperative`] ports, so it builds and
//! tests on the host.
//!
//! With the `esp32c6` feature the crate also carries the ESP32-C6 firmware:
//! esp-hal adapters for those ports, the status LED and the embassy tasks.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod air_quality;
pub mod calibration;
pub mod config;
pub mod cooperative;
pub mod mq135;
pub mod sampler;

#[cfg(feature = "esp32c6")]
pub mod hal;
#[cfg(feature = "esp32c6")]
pub mod led;
#[cfg(feature = "esp32c6")]
pub mod tasks;

pub use calibration::CalibrationReport;
pub use cooperative::{AsyncCooperativeYield, CooperativeYield, NoYield};
pub use mq135::{Mq135, Mq135Error};
pub use sampler::AnalogSampler;

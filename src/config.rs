//! Firmware configuration
//!
//! The sensor's physical constants are fixed in [`crate::mq135`]; this is
//! everything the application around it can tune.

use crate::mq135::ATMOCO2;

/// Run-time settings for the warm-up, calibration and measurement tasks
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppConfig {
    /// Heater preheat time before calibrating (seconds)
    pub warmup_secs: u16,
    /// Time between measurements (seconds)
    pub measurement_interval_secs: u16,
    /// Reference concentration the sensor is calibrated against (ppm)
    pub calibration_ppm: f32,
    /// Ambient temperature used for compensation (C)
    pub ambient_temperature_c: f32,
    /// Ambient relative humidity used for compensation (%)
    pub ambient_humidity_pct: f32,
    /// Apply the temperature/humidity correction to readings
    pub compensate: bool,
    /// GPIO wired to the sensor's analog output
    pub sensor_gpio: u8,
    /// GPIO wired to the voltage reference
    pub reference_gpio: u8,
}

impl AppConfig {
    pub const fn new() -> Self {
        Self {
            warmup_secs: 60,
            measurement_interval_secs: 2,
            calibration_ppm: ATMOCO2,
            ambient_temperature_c: 20.0,
            ambient_humidity_pct: 33.0,
            compensate: true,
            sensor_gpio: 2,
            reference_gpio: 3,
        }
    }

    /// Short preheat for bench work with an already warm sensor
    pub const fn fast_start() -> Self {
        Self {
            warmup_secs: 5,
            measurement_interval_secs: 1,
            ..Self::new()
        }
    }

    /// Temperature/humidity pair to pass to corrected reads
    pub const fn ambient(&self) -> (f32, f32) {
        (self.ambient_temperature_c, self.ambient_humidity_pct)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

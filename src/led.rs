use defmt::debug;
use embassy_time::{Duration, Timer};
use esp_hal::gpio::Output;

use crate::air_quality::AirQuality;

/// Blink half-period when a command does not specify one
const DEFAULT_BLINK_MS: u16 = 250;

/// Single-colour status LED on a GPIO
pub struct Led {
    gpio: Output<'static>,
}

impl Led {
    pub fn new_gpio(pin: Output<'static>) -> Self {
        Self { gpio: pin }
    }

    pub fn set(&mut self, on: bool) {
        if on {
            self.gpio.set_high();
        } else {
            self.gpio.set_low();
        }
    }

    /// Flash once: on for `period_ms`, off for `period_ms`
    pub async fn blink(&mut self, period_ms: Option<u16>) {
        let half_period = Duration::from_millis(period_ms.unwrap_or(DEFAULT_BLINK_MS) as u64);
        debug!("GPIO LED - Blink");
        self.set(true);
        Timer::after(half_period).await;
        self.set(false);
        Timer::after(half_period).await;
    }
}

// Messages for the LED task
#[derive(Copy, Clone, Debug, PartialEq, Eq, defmt::Format)]
pub enum LedCommand {
    Solid(bool),
    Blink(Option<u16>), // period_ms
}

impl LedCommand {
    /// Dark for good air, lit for moderate, blinking for poor
    pub fn for_air_quality(quality: AirQuality) -> Self {
        match quality {
            AirQuality::Good => LedCommand::Solid(false),
            AirQuality::Moderate => LedCommand::Solid(true),
            AirQuality::Poor => LedCommand::Blink(None),
        }
    }
}

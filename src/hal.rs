// ─────────────────────────────────────────────────────────────────────────────
// esp-hal adapters for the sensor model's ports: ADC1 one-shot reads for the
// analog sampler and embassy-time ticks for the cooperative yield.

use embassy_time::Timer;
use esp_hal::analog::adc::{Adc, AdcCalCurve, AdcCalScheme, AdcChannel, AdcPin, RegisterAccess};
use esp_hal::peripherals::{ADC1, GPIO2, GPIO3};
use esp_hal::Blocking;

use crate::cooperative::AsyncCooperativeYield;
use crate::mq135::Mq135;
use crate::sampler::{millivolts_to_code, AnalogSampler};

/// ADC instance the sensor is wired to
pub type BoardAdc = ADC1<'static>;
/// Calibration context injected into the sampler
pub type BoardCalibration = AdcCalCurve<BoardAdc>;
pub type BoardSampler = EspAdcSampler<'static, BoardAdc, GPIO2<'static>, GPIO3<'static>, BoardCalibration>;
pub type BoardSensor = Mq135<BoardSampler>;

/// Inputs the MQ135 board exposes
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Mq135Channel {
    /// Sensor analog output
    Sensor,
    /// Voltage reference
    Reference,
}

/// The ADC did not deliver a conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct AdcReadError;

/// Analog sampler backed by one esp-hal ADC and two calibrated pins
///
/// The calibration scheme `CS` must report millivolts (line or curve
/// fitting); readings are mapped back onto the 12-bit code scale.
pub struct EspAdcSampler<'d, ADCI, SP, RP, CS> {
    adc: Adc<'d, ADCI, Blocking>,
    sensor: AdcPin<SP, ADCI, CS>,
    reference: AdcPin<RP, ADCI, CS>,
}

impl<'d, ADCI, SP, RP, CS> EspAdcSampler<'d, ADCI, SP, RP, CS> {
    pub fn new(
        adc: Adc<'d, ADCI, Blocking>,
        sensor: AdcPin<SP, ADCI, CS>,
        reference: AdcPin<RP, ADCI, CS>,
    ) -> Self {
        Self {
            adc,
            sensor,
            reference,
        }
    }
}

impl<'d, ADCI, SP, RP, CS> AnalogSampler for EspAdcSampler<'d, ADCI, SP, RP, CS>
where
    ADCI: RegisterAccess + 'd,
    SP: AdcChannel,
    RP: AdcChannel,
    CS: AdcCalScheme<ADCI>,
{
    type Channel = Mq135Channel;
    type Error = AdcReadError;

    fn sample(&mut self, channel: Mq135Channel) -> Result<u16, AdcReadError> {
        let millivolts = match channel {
            Mq135Channel::Sensor => nb::block!(self.adc.read_oneshot(&mut self.sensor)),
            Mq135Channel::Reference => nb::block!(self.adc.read_oneshot(&mut self.reference)),
        }
        .map_err(|_| AdcReadError)?;

        Ok(millivolts_to_code(millivolts))
    }

    fn reference_channel(&self) -> Mq135Channel {
        Mq135Channel::Reference
    }
}

/// Yields by sleeping for a single embassy-time tick
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyYield;

impl AsyncCooperativeYield for EmbassyYield {
    async fn yield_now(&mut self) {
        Timer::after_ticks(1).await;
    }
}
// ─────────────────────────────────────────────────────────────────────────────

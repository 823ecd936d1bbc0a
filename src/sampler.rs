//! Analog sampler port
//!
//! The sensor model never touches the ADC directly. It asks an
//! [`AnalogSampler`] for 12-bit codes, so the hardware, its calibration
//! context and the board's reference channel all live behind this trait.

/// Full-scale value of a 12-bit ADC reading
pub const ADC_MAX: f32 = 4095.0;

/// Voltage corresponding to [`ADC_MAX`] (11 dB attenuation on the ESP32 family)
pub const ADC_FULL_SCALE_VOLTS: f32 = 2.45;

/// Largest code a sampler may return
pub const ADC_MAX_CODE: u16 = 4095;

/// Port for reading raw ADC codes
///
/// # Example Implementation
///
/// ```ignore
/// struct FixedSampler { sensor: u16, reference: u16 }
///
/// impl AnalogSampler for FixedSampler {
///     type Channel = u8;
///     type Error = core::convert::Infallible;
///
///     fn sample(&mut self, channel: u8) -> Result<u16, Self::Error> {
///         Ok(if channel == 1 { self.reference } else { self.sensor })
///     }
///
///     fn reference_channel(&self) -> u8 { 1 }
/// }
/// ```
pub trait AnalogSampler {
    /// Identifier of an analog input
    type Channel: Copy;
    /// Hardware error reported by a failed read
    type Error;

    /// Take one reading on `channel`, returning a code in `0..=4095`
    fn sample(&mut self, channel: Self::Channel) -> Result<u16, Self::Error>;

    /// Channel wired to the voltage reference on this board
    fn reference_channel(&self) -> Self::Channel;
}

impl<S: AnalogSampler + ?Sized> AnalogSampler for &mut S {
    type Channel = S::Channel;
    type Error = S::Error;

    fn sample(&mut self, channel: Self::Channel) -> Result<u16, Self::Error> {
        (**self).sample(channel)
    }

    fn reference_channel(&self) -> Self::Channel {
        (**self).reference_channel()
    }
}

/// Normalize a 12-bit code to volts over the 0-2.45 V range
#[inline]
pub fn code_to_volts(code: u16) -> f32 {
    code as f32 * ADC_FULL_SCALE_VOLTS / ADC_MAX
}

/// Convert a calibrated millivolt reading back onto the 12-bit code scale
///
/// Calibrated ADC drivers report millivolts rather than raw codes. Readings
/// above full scale saturate at [`ADC_MAX_CODE`].
pub fn millivolts_to_code(millivolts: u16) -> u16 {
    let full_scale_mv = (ADC_FULL_SCALE_VOLTS * 1000.0) as u32;
    let code = millivolts as u32 * ADC_MAX_CODE as u32 / full_scale_mv;
    code.min(ADC_MAX_CODE as u32) as u16
}

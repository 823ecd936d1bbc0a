//! Air quality bands for CO2 readings

/// Upper bound of the `Good` band, ppm
pub const GOOD_MAX_PPM: f32 = 800.0;
/// Upper bound of the `Moderate` band, ppm
pub const MODERATE_MAX_PPM: f32 = 1500.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AirQuality {
    Good,
    Moderate,
    Poor,
}

impl AirQuality {
    /// Classify a CO2 reading. NaN readings are treated as `Poor`.
    pub fn from_ppm(ppm: f32) -> Self {
        if ppm <= GOOD_MAX_PPM {
            AirQuality::Good
        } else if ppm <= MODERATE_MAX_PPM {
            AirQuality::Moderate
        } else {
            AirQuality::Poor
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AirQuality::Good => "good",
            AirQuality::Moderate => "moderate",
            AirQuality::Poor => "poor",
        }
    }
}

//! MQ135 gas sensor model
//!
//! Converts the sensor's voltage divider reading into a resistance and the
//! resistance into a CO2 estimate with the datasheet power law
//! `ppm = PARA * (Rs / RZero) ^ -PARB`.

use libm::powf;

use crate::calibration::{CalibrationReport, CalibrationSearch, SearchStep};
use crate::cooperative::{AsyncCooperativeYield, CooperativeYield};
use crate::sampler::{code_to_volts, AnalogSampler, ADC_MAX_CODE};

/// Load resistance on the board in kOhm
pub const RLOAD: f32 = 10.0;
/// Default calibration resistance at atmospheric CO2 level, kOhm
pub const RZERO: f32 = 76.63;

/// Parameters of the CO2 curve
pub const PARA: f32 = 116.6020682;
pub const PARB: f32 = 2.769034857;

/// Parameters of the temperature and humidity dependence
pub const CORA: f32 = 0.00035;
pub const CORB: f32 = 0.02718;
pub const CORC: f32 = 1.39538;
pub const CORD: f32 = 0.0018;

/// Atmospheric CO2 level used as the calibration reference, ppm
pub const ATMOCO2: f32 = 397.13;

/// Error type for sensor operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mq135Error<E> {
    /// The analog sampler failed to read a channel
    Sampler(E),
    /// The sampler returned a code above 4095
    SampleOutOfRange(u16),
    /// RZero must be positive and finite
    InvalidRZero,
}

/// Temperature/humidity correction multiplier
///
/// Defined for every input; values outside the sensor's validated range
/// give non-physical factors, including zero.
#[inline]
pub fn correction_factor(temperature: f32, humidity: f32) -> f32 {
    CORA * temperature * temperature - CORB * temperature + CORC - (humidity - 33.0) * CORD
}

/// Sensor resistance in kOhm from a sensor and a reference reading
///
/// `Rs = 3 * Vref * RLOAD / V - 2`. A zero sensor code yields `+inf`.
#[inline]
pub fn resistance_from_samples(raw: u16, raw_reference: u16) -> f32 {
    let volts = code_to_volts(raw);
    let reference_volts = code_to_volts(raw_reference);
    3.0 * reference_volts * RLOAD / volts - 2.0
}

/// CO2 concentration in ppm for a resistance and calibration value
#[inline]
pub fn ppm_from_resistance(resistance: f32, rzero: f32) -> f32 {
    PARA * powf(resistance / rzero, -PARB)
}

/// RZero that makes `resistance` read as [`ATMOCO2`]
#[inline]
pub fn rzero_from_resistance(resistance: f32) -> f32 {
    resistance * powf(ATMOCO2 / PARA, 1.0 / PARB)
}

/// MQ135 sensor bound to one analog channel
pub struct Mq135<S: AnalogSampler> {
    sampler: S,
    channel: S::Channel,
    rzero: f32,
}

impl<S: AnalogSampler> Mq135<S> {
    /// Create a sensor on `channel` with the default [`RZERO`]
    pub fn new(sampler: S, channel: S::Channel) -> Self {
        Self {
            sampler,
            channel,
            rzero: RZERO,
        }
    }

    /// Create a sensor with a previously calibrated RZero
    pub fn with_rzero(
        sampler: S,
        channel: S::Channel,
        rzero: f32,
    ) -> Result<Self, Mq135Error<S::Error>> {
        if !(rzero.is_finite() && rzero > 0.0) {
            return Err(Mq135Error::InvalidRZero);
        }
        Ok(Self {
            sampler,
            channel,
            rzero,
        })
    }

    /// Current calibration resistance in kOhm
    pub fn rzero(&self) -> f32 {
        self.rzero
    }

    pub fn channel(&self) -> S::Channel {
        self.channel
    }

    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    /// Give the sampler back
    pub fn release(self) -> S {
        self.sampler
    }

    /// See [`correction_factor`]
    pub fn correction_factor(&self, temperature: f32, humidity: f32) -> f32 {
        correction_factor(temperature, humidity)
    }

    fn sample(&mut self, channel: S::Channel) -> Result<u16, Mq135Error<S::Error>> {
        let code = self.sampler.sample(channel).map_err(Mq135Error::Sampler)?;
        if code > ADC_MAX_CODE {
            return Err(Mq135Error::SampleOutOfRange(code));
        }
        Ok(code)
    }

    /// Sample the sensor and reference channels and return Rs in kOhm
    ///
    /// A zero sensor reading (e.g. a disconnected sensor) is not special-cased
    /// and comes back as `f32::INFINITY`.
    pub fn read_resistance(&mut self) -> Result<f32, Mq135Error<S::Error>> {
        let raw = self.sample(self.channel)?;
        let raw_reference = self.sample(self.sampler.reference_channel())?;
        let resistance = resistance_from_samples(raw, raw_reference);

        debug!(
            "analogRead = {} ({} V), ref = {} ({} V), Rs = {}",
            raw,
            code_to_volts(raw),
            raw_reference,
            code_to_volts(raw_reference),
            resistance
        );
        Ok(resistance)
    }

    /// Rs corrected for ambient temperature (C) and relative humidity (%)
    pub fn read_corrected_resistance(
        &mut self,
        temperature: f32,
        humidity: f32,
    ) -> Result<f32, Mq135Error<S::Error>> {
        Ok(self.read_resistance()? / correction_factor(temperature, humidity))
    }

    /// CO2 in ppm, assuming CO2 is the only gas sensed
    pub fn read_ppm(&mut self) -> Result<f32, Mq135Error<S::Error>> {
        Ok(ppm_from_resistance(self.read_resistance()?, self.rzero))
    }

    pub fn read_corrected_ppm(
        &mut self,
        temperature: f32,
        humidity: f32,
    ) -> Result<f32, Mq135Error<S::Error>> {
        let resistance = self.read_corrected_resistance(temperature, humidity)?;
        Ok(ppm_from_resistance(resistance, self.rzero))
    }

    /// RZero implied by the current reading, assuming atmospheric CO2
    ///
    /// Inspection only: the stored RZero is left alone.
    pub fn read_rzero(&mut self) -> Result<f32, Mq135Error<S::Error>> {
        Ok(rzero_from_resistance(self.read_resistance()?))
    }

    pub fn read_corrected_rzero(
        &mut self,
        temperature: f32,
        humidity: f32,
    ) -> Result<f32, Mq135Error<S::Error>> {
        Ok(rzero_from_resistance(
            self.read_corrected_resistance(temperature, humidity)?,
        ))
    }

    /// Adjust RZero until the corrected reading matches `target_ppm`
    ///
    /// Returns `Ok(true)` when the search converged in fewer than
    /// [`SUCCESS_ITERATION_LIMIT`](crate::calibration::SUCCESS_ITERATION_LIMIT)
    /// iterations. RZero keeps the last value reached either way.
    pub fn calibrate_rzero<Y: CooperativeYield>(
        &mut self,
        target_ppm: f32,
        temperature: f32,
        humidity: f32,
        yielder: &mut Y,
    ) -> Result<bool, Mq135Error<S::Error>> {
        let report = self.calibrate_rzero_with_report(target_ppm, temperature, humidity, yielder)?;
        Ok(report.is_success())
    }

    pub fn calibrate_rzero_with_report<Y: CooperativeYield>(
        &mut self,
        target_ppm: f32,
        temperature: f32,
        humidity: f32,
        yielder: &mut Y,
    ) -> Result<CalibrationReport, Mq135Error<S::Error>> {
        let initial = self.read_corrected_ppm(temperature, humidity)?;
        let mut search = CalibrationSearch::new(target_ppm, initial);

        while let Some(next) = search.next_rzero(self.rzero) {
            self.rzero = next;
            let measurement = self.read_corrected_ppm(temperature, humidity)?;
            match search.observe(measurement) {
                SearchStep::Continue => {}
                SearchStep::Yield => yielder.yield_now(),
                SearchStep::Done => break,
            }
        }

        Ok(self.finish_calibration(&search))
    }

    /// Same search as [`calibrate_rzero_with_report`](Self::calibrate_rzero_with_report),
    /// awaiting the yield so an async executor keeps running other tasks
    pub async fn calibrate_rzero_async<Y: AsyncCooperativeYield>(
        &mut self,
        target_ppm: f32,
        temperature: f32,
        humidity: f32,
        yielder: &mut Y,
    ) -> Result<CalibrationReport, Mq135Error<S::Error>> {
        let initial = self.read_corrected_ppm(temperature, humidity)?;
        let mut search = CalibrationSearch::new(target_ppm, initial);

        while let Some(next) = search.next_rzero(self.rzero) {
            self.rzero = next;
            let measurement = self.read_corrected_ppm(temperature, humidity)?;
            match search.observe(measurement) {
                SearchStep::Continue => {}
                SearchStep::Yield => yielder.yield_now().await,
                SearchStep::Done => break,
            }
        }

        Ok(self.finish_calibration(&search))
    }

    fn finish_calibration(&self, search: &CalibrationSearch) -> CalibrationReport {
        let report = search.report(self.rzero);
        if report.is_success() {
            info!(
                "Calibrated in {} iterations, RZero = {}",
                report.iterations, report.rzero
            );
        } else {
            error!(
                "Failed to calibrate in {} iterations, RZero = {}",
                report.iterations, report.rzero
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    const SENSOR: u8 = 0;
    const REFERENCE: u8 = 1;

    /// Returns the same codes on every read
    struct FixedSampler {
        sensor: u16,
        reference: u16,
        reads: u32,
    }

    impl FixedSampler {
        fn new(sensor: u16, reference: u16) -> Self {
            Self {
                sensor,
                reference,
                reads: 0,
            }
        }
    }

    impl AnalogSampler for FixedSampler {
        type Channel = u8;
        type Error = Infallible;

        fn sample(&mut self, channel: u8) -> Result<u16, Infallible> {
            self.reads += 1;
            Ok(if channel == REFERENCE {
                self.reference
            } else {
                self.sensor
            })
        }

        fn reference_channel(&self) -> u8 {
            REFERENCE
        }
    }

    #[derive(Debug, PartialEq)]
    struct BusFault;

    /// Fails once `remaining` reads have been served
    struct FlakySampler {
        remaining: u32,
    }

    impl AnalogSampler for FlakySampler {
        type Channel = u8;
        type Error = BusFault;

        fn sample(&mut self, _channel: u8) -> Result<u16, BusFault> {
            if self.remaining == 0 {
                return Err(BusFault);
            }
            self.remaining -= 1;
            Ok(1000)
        }

        fn reference_channel(&self) -> u8 {
            REFERENCE
        }
    }

    fn sensor(raw: u16, reference: u16) -> Mq135<FixedSampler> {
        Mq135::new(FixedSampler::new(raw, reference), SENSOR)
    }

    #[test]
    fn test_correction_factor_is_deterministic() {
        for &(t, h) in &[(-10.0, 10.0), (0.0, 33.0), (20.0, 33.0), (35.5, 85.0)] {
            assert_eq!(correction_factor(t, h), correction_factor(t, h));
        }
        // At 20 C / 33 %RH: 0.00035*400 - 0.02718*20 + 1.39538
        let expected = 0.14 - 0.5436 + 1.39538;
        assert!((correction_factor(20.0, 33.0) - expected).abs() < 1e-5);
        // Humidity enters linearly with slope -CORD
        let delta = correction_factor(20.0, 43.0) - correction_factor(20.0, 33.0);
        assert!((delta + 10.0 * CORD).abs() < 1e-5);
    }

    #[test]
    fn test_resistance_from_divider() {
        // Sensor at half the reference voltage: Rs = 3 * 2 * 10 - 2
        let mut mq = sensor(1000, 2000);
        let rs = mq.read_resistance().unwrap();
        assert!((rs - 58.0).abs() < 1e-3);
        assert_eq!(mq.sampler_mut().reads, 2);
    }

    #[test]
    fn test_zero_sample_gives_infinite_resistance() {
        let mut mq = sensor(0, 2000);
        let rs = mq.read_resistance().unwrap();
        assert!(rs.is_infinite() && rs > 0.0);
        // ppm collapses to zero rather than panicking
        assert_eq!(mq.read_ppm().unwrap(), 0.0);
    }

    #[test]
    fn test_corrected_resistance_divides_by_factor() {
        let mut mq = sensor(1234, 2345);
        let raw = mq.read_resistance().unwrap();
        for &(t, h) in &[(5.0, 20.0), (20.0, 33.0), (30.0, 70.0)] {
            let corrected = mq.read_corrected_resistance(t, h).unwrap();
            assert_eq!(corrected, raw / correction_factor(t, h));
        }
    }

    #[test]
    fn test_zero_correction_factor_is_not_guarded() {
        // Solve CORD * (h - 33) = factor(t, 33) for a humidity that zeroes the factor
        let t = 20.0;
        let h = 33.0 + correction_factor(t, 33.0) / CORD;
        let factor = correction_factor(t, h);
        assert!(factor.abs() < 1e-3);

        let mut mq = sensor(1000, 2000);
        let corrected = mq.read_corrected_resistance(t, h).unwrap();
        assert!(corrected.abs() > 1e4 || !corrected.is_finite());
    }

    #[test]
    fn test_rzero_round_trip_reproduces_atmospheric_level() {
        let mut mq = sensor(1500, 2500);
        let rzero = mq.read_rzero().unwrap();
        let resistance = mq.read_resistance().unwrap();

        let mut calibrated =
            Mq135::with_rzero(FixedSampler::new(1500, 2500), SENSOR, rzero).unwrap();
        let ppm = calibrated.read_ppm().unwrap();
        assert!((ppm - ATMOCO2).abs() < 0.05, "ppm = {}", ppm);
        assert!((ppm_from_resistance(resistance, rzero) - ATMOCO2).abs() < 0.05);
        // Inspection leaves the stored value alone
        assert_eq!(mq.rzero(), RZERO);
    }

    #[test]
    fn test_corrected_rzero_uses_corrected_resistance() {
        let mut mq = sensor(1500, 2500);
        let corrected = mq.read_corrected_resistance(25.0, 60.0).unwrap();
        let rzero = mq.read_corrected_rzero(25.0, 60.0).unwrap();
        assert_eq!(rzero, rzero_from_resistance(corrected));
    }

    #[test]
    fn test_ppm_falls_as_resistance_rises() {
        let low = ppm_from_resistance(40.0, RZERO);
        let high = ppm_from_resistance(80.0, RZERO);
        assert!(low > high);
        assert!((ppm_from_resistance(RZERO, RZERO) - PARA).abs() < 1e-3);
    }

    #[test]
    fn test_with_rzero_rejects_non_positive() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = Mq135::with_rzero(FixedSampler::new(1, 1), SENSOR, bad);
            assert!(matches!(result, Err(Mq135Error::InvalidRZero)));
        }
    }

    #[test]
    fn test_out_of_range_sample() {
        let mut mq = sensor(5000, 2000);
        assert_eq!(
            mq.read_resistance().unwrap_err(),
            Mq135Error::SampleOutOfRange(5000)
        );
    }

    #[test]
    fn test_sampler_error_propagates() {
        let mut mq = Mq135::new(
            FlakySampler { remaining: 1 },
            SENSOR,
        );
        // The sensor channel succeeds, the reference read fails
        assert_eq!(mq.read_ppm().unwrap_err(), Mq135Error::Sampler(BusFault));
    }

    #[test]
    fn test_calibration_converges_within_one_step() {
        let (t, h) = (20.0, 33.0);
        // 1000/2000 codes give Rs = 58 kOhm; pick a target a few dozen steps away
        let mut mq = sensor(1000, 2000);
        let target = mq.read_corrected_ppm(t, h).unwrap() * 0.9;
        let mut yields = 0u32;

        let report = mq
            .calibrate_rzero_with_report(target, t, h, &mut || yields += 1)
            .unwrap();

        assert!(report.converged);
        assert!(report.is_success());
        assert!(report.iterations < 1000);
        assert_eq!(report.rzero, mq.rzero());
        assert_eq!(yields, report.iterations / 30);

        let after = mq.read_corrected_ppm(t, h).unwrap();
        assert!(after <= target);
        // Undoing the last 0.1 step must land back above the target
        let before_last = ppm_from_resistance(
            mq.read_corrected_resistance(t, h).unwrap(),
            mq.rzero() + 0.1,
        );
        assert!(before_last > target);
    }

    #[test]
    fn test_calibration_increases_rzero_when_reading_is_low() {
        let (t, h) = (20.0, 33.0);
        let mut mq = sensor(1000, 2000);
        let start = mq.read_corrected_ppm(t, h).unwrap();

        let ok = mq
            .calibrate_rzero(start * 1.1, t, h, &mut crate::cooperative::NoYield)
            .unwrap();

        assert!(ok);
        assert!(mq.rzero() > RZERO);
        assert!(mq.read_corrected_ppm(t, h).unwrap() >= start * 1.1);
    }

    #[test]
    fn test_calibration_resamples_every_iteration() {
        let mut mq = sensor(1000, 2000);
        let target = mq.read_corrected_ppm(20.0, 33.0).unwrap() * 0.95;
        let before = mq.sampler_mut().reads;

        let report = mq
            .calibrate_rzero_with_report(target, 20.0, 33.0, &mut crate::cooperative::NoYield)
            .unwrap();

        // Initial reading plus one per iteration, two channels each
        let reads = mq.sampler_mut().reads - before;
        assert_eq!(reads, 2 * (report.iterations + 2));
    }

    #[test]
    fn test_calibration_failure_keeps_furthest_rzero() {
        let (t, h) = (20.0, 33.0);
        let mut mq = sensor(1000, 2000);
        let mut yields = 0u32;

        let ok = mq.calibrate_rzero(1.0e12, t, h, &mut || yields += 1).unwrap();

        assert!(!ok);
        // No rollback: 10000 steps of +0.1 from the default
        assert!((mq.rzero() - (RZERO + 1000.0)).abs() < 0.5, "rzero = {}", mq.rzero());
        assert_eq!(yields, 10_000 / 30);
    }

    #[test]
    fn test_calibration_stops_before_rzero_turns_negative() {
        // A target of zero is only reachable at RZero = 0
        let mut mq = sensor(1000, 2000);
        let report = mq
            .calibrate_rzero_with_report(0.0, 20.0, 33.0, &mut crate::cooperative::NoYield)
            .unwrap();

        assert!(!report.converged);
        assert!(mq.rzero() > 0.0 && mq.rzero() <= 0.1);
        assert_eq!(report.iterations, 766);
    }

    #[test]
    fn test_calibration_error_aborts_search() {
        let mut mq = Mq135::new(
            FlakySampler { remaining: 6 },
            SENSOR,
        );
        let result = mq.calibrate_rzero(1.0, 20.0, 33.0, &mut crate::cooperative::NoYield);
        assert_eq!(result, Err(Mq135Error::Sampler(BusFault)));
        // Initial reading and two full iterations, then the third step's read fails
        assert!((mq.rzero() - (RZERO - 0.3)).abs() < 1e-3);
    }

    #[test]
    fn test_async_calibration_matches_blocking() {
        use core::future::Future;
        use core::pin::pin;
        use core::task::{Context, Poll, Waker};

        struct CountingYield(u32);

        impl AsyncCooperativeYield for CountingYield {
            async fn yield_now(&mut self) {
                self.0 += 1;
            }
        }

        let target = sensor(1000, 2000).read_corrected_ppm(20.0, 33.0).unwrap() * 0.8;

        let mut blocking = sensor(1000, 2000);
        let expected = blocking
            .calibrate_rzero_with_report(target, 20.0, 33.0, &mut crate::cooperative::NoYield)
            .unwrap();

        let mut mq = sensor(1000, 2000);
        let mut yielder = CountingYield(0);
        let report = {
            let mut fut = pin!(mq.calibrate_rzero_async(target, 20.0, 33.0, &mut yielder));
            let mut cx = Context::from_waker(Waker::noop());
            match fut.as_mut().poll(&mut cx) {
                Poll::Ready(report) => report.unwrap(),
                Poll::Pending => panic!("calibration should not suspend"),
            }
        };

        assert_eq!(report, expected);
        assert_eq!(yielder.0, report.iterations / 30);
    }
}

//! RZero calibration search
//!
//! One search walks RZero in fixed steps toward a known reference
//! concentration. The direction is picked from the first reading and never
//! changes; the walk ends when a reading crosses the target or the
//! iteration budget runs out.
//!
//! [`CalibrationSearch`] holds only the bookkeeping. The sensor model owns
//! RZero and the sampling, so the same search drives both the blocking and
//! the async calibration loops.

/// RZero adjustment per iteration, kOhm
pub const STEP: f32 = 0.1;

/// Hard cap on search iterations
pub const MAX_ITERATIONS: u32 = 10_000;

/// A search only counts as successful below this many iterations.
///
/// Kept one order of magnitude under [`MAX_ITERATIONS`] for compatibility
/// with existing calibration behaviour.
pub const SUCCESS_ITERATION_LIMIT: u32 = 1_000;

/// Completed iterations between two cooperative yields
pub const YIELD_INTERVAL: u32 = 30;

/// What the caller should do after an observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SearchStep {
    /// Take the next step
    Continue,
    /// Yield to the scheduler, then take the next step
    Yield,
    /// The search is over
    Done,
}

/// Outcome of a calibration run
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    /// Iterations completed before the crossing (or the full budget)
    pub iterations: u32,
    /// RZero when the search stopped, kOhm
    pub rzero: f32,
    /// Whether a reading crossed the target
    pub converged: bool,
}

impl CalibrationReport {
    /// Converged within [`SUCCESS_ITERATION_LIMIT`]
    pub fn is_success(&self) -> bool {
        self.converged && self.iterations < SUCCESS_ITERATION_LIMIT
    }
}

/// Bookkeeping for one calibration run
#[derive(Clone, Copy, Debug)]
pub struct CalibrationSearch {
    target_ppm: f32,
    step: f32,
    iterations: u32,
    converged: bool,
    finished: bool,
}

impl CalibrationSearch {
    /// Start a search from the reading taken with the current RZero
    ///
    /// RZero is lowered when the reading is above the target and raised
    /// otherwise.
    pub fn new(target_ppm: f32, initial_ppm: f32) -> Self {
        let step = if initial_ppm > target_ppm { -STEP } else { STEP };
        Self {
            target_ppm,
            step,
            iterations: 0,
            converged: false,
            finished: false,
        }
    }

    /// Signed step applied each iteration
    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// RZero for the next iteration, or `None` once the search is over
    ///
    /// A step that would take RZero to zero or below ends the search
    /// unconverged and is not applied.
    pub fn next_rzero(&mut self, rzero: f32) -> Option<f32> {
        if self.finished {
            return None;
        }
        let next = rzero + self.step;
        if next <= 0.0 {
            self.finished = true;
            return None;
        }
        Some(next)
    }

    /// Record the reading taken after applying a step
    pub fn observe(&mut self, measurement_ppm: f32) -> SearchStep {
        let crossed = if self.step < 0.0 {
            measurement_ppm <= self.target_ppm
        } else {
            measurement_ppm >= self.target_ppm
        };
        if crossed {
            self.converged = true;
            self.finished = true;
            return SearchStep::Done;
        }

        self.iterations += 1;
        if self.iterations >= MAX_ITERATIONS {
            self.finished = true;
            SearchStep::Done
        } else if self.iterations % YIELD_INTERVAL == 0 {
            SearchStep::Yield
        } else {
            SearchStep::Continue
        }
    }

    /// Summarize the run with the RZero it ended on
    pub fn report(&self, rzero: f32) -> CalibrationReport {
        CalibrationReport {
            iterations: self.iterations,
            rzero,
            converged: self.converged,
        }
    }
}

//! Cooperative yield capability
//!
//! Long-running loops hand control back to the scheduler through these
//! traits instead of calling a scheduler API, which keeps them testable
//! without one.

use core::future::Future;

/// Blocking yield: returns after the scheduler has had a chance to run other work
pub trait CooperativeYield {
    fn yield_now(&mut self);
}

impl<F: FnMut()> CooperativeYield for F {
    fn yield_now(&mut self) {
        self()
    }
}

/// Yield that does nothing, for single-task callers
#[derive(Clone, Copy, Debug, Default)]
pub struct NoYield;

impl CooperativeYield for NoYield {
    fn yield_now(&mut self) {}
}

/// Async yield for executors such as embassy
pub trait AsyncCooperativeYield {
    fn yield_now(&mut self) -> impl Future<Output = ()>;
}

impl AsyncCooperativeYield for NoYield {
    async fn yield_now(&mut self) {}
}

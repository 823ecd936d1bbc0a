pub mod led;
pub mod measurement;
pub mod warmup;

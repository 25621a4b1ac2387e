use chrono::NaiveDate;
use std::time::Instant;

pub trait ClockPort: Send + Sync {
    fn now(&self) -> Instant;
    /// Local calendar date used to pick the daily melody.
    fn today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

//! Wall-clock seam so the rate limiter and freshness checks can run on fake time.

use chrono::{DateTime, Local};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Local>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Local> { Local::now() }
}

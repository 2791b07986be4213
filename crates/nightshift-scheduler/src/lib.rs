//! Daily restart scheduling: clock seam, time-of-day math, and the poll
//! loop that drives resolve + restart once per calendar day.

pub mod clock;
pub mod engine;
pub mod schedule;

pub use clock::{Clock, SystemClock};
pub use engine::RestartEngine;
pub use schedule::DailySchedule;

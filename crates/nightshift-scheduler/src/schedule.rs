use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};

/// A once-a-day wall-clock trigger (local time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    hour: u8,
    minute: u8,
}

impl DailySchedule {
    fn target_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
    }

    /// True when `now` has reached today's trigger time and today has not
    /// fired yet. `>=` rather than `==` so a process started after the
    /// trigger still fires within one poll interval.
    pub fn is_due(&self, now: DateTime<Local>, last_fired: Option<NaiveDate>) -> bool {
        if last_fired == Some(now.date_naive()) {
            return false;
        }
        match self.target_time() {
            Some(target) => now.time() >= target,
            None => false,
        }
    }

    /// Next instant the schedule triggers strictly after `now`: today at
    /// HH:MM if that is still ahead, otherwise tomorrow.
    pub fn next_fire(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let target = self.target_time()?;
        let today = Local
            .from_local_datetime(&now.date_naive().and_time(target))
            .single()?;
        if today > now {
            return Some(today);
        }
        let tomorrow = now.date_naive().succ_opt()?.and_time(target);
        Local.from_local_datetime(&tomorrow).single()
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for DailySchedule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || format!("invalid restart time {s:?}: expected HH:MM (24-hour)");
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        let hour: u8 = h.parse().map_err(|_| err())?;
        let minute: u8 = m.parse().map_err(|_| err())?;
        if hour > 23 || minute > 59 {
            return Err(err());
        }
        Ok(Self { hour, minute })
    }
}

use crate::types::hour_minute;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::Serialize;

pub const FIRST_SERVICE_HOUR: u32 = 9;
pub const LAST_SERVICE_HOUR: u32 = 16;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Hourly start times of the service window, earliest first.
pub fn service_times() -> impl Iterator<Item = NaiveTime> {
    (FIRST_SERVICE_HOUR..=LAST_SERVICE_HOUR).filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
}

pub fn is_service_time(time: NaiveTime) -> bool {
    time.minute() == 0
        && time.second() == 0
        && (FIRST_SERVICE_HOUR..=LAST_SERVICE_HOUR).contains(&time.hour())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), hour_minute::FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Weekend {
    pub saturday: NaiveDate,
    pub sunday: NaiveDate,
}

impl Weekend {
    fn starting(saturday: NaiveDate) -> Option<Self> {
        Some(Self {
            saturday,
            sunday: saturday.succ_opt()?,
        })
    }
}

/// Lists `count` weekends after skipping `skip` of them, beginning with the
/// first Saturday on or after `today`. Stops early at the end of the calendar.
pub fn upcoming_weekends(
    today: NaiveDate,
    count: usize,
    skip: usize,
) -> impl Iterator<Item = Weekend> {
    let days_until_saturday = (Weekday::Sat.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;
    let first_saturday = today.checked_add_days(Days::new(u64::from(days_until_saturday)));

    (skip..skip.saturating_add(count)).map_while(move |week| {
        let offset = u64::try_from(week).ok()?.checked_mul(7)?;
        Weekend::starting(first_saturday?.checked_add_days(Days::new(offset))?)
    })
}

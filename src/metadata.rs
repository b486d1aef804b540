use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{default_start_time, hhmm, timestamp};

pub const DEFAULT_TIMEZONE: &str = "UTC";

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_week_count() -> u32 {
    1
}

/// Document header. `timezone` is an IANA name carried through unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMeta {
    #[serde(default)]
    pub owner: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub start_date: NaiveDate,
    #[serde(with = "hhmm", default = "default_start_time")]
    pub start_time: NaiveTime,
    #[serde(default = "default_week_count", alias = "num_weeks")]
    pub weeks: u32,
    #[serde(
        with = "timestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generated_at: Option<NaiveDateTime>,
}

impl ScheduleMeta {
    pub fn new(start_date: NaiveDate, start_time: NaiveTime, weeks: u32) -> Self {
        Self {
            owner: String::new(),
            timezone: default_timezone(),
            start_date,
            start_time,
            weeks,
            generated_at: None,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }
}

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

use crate::calendar::{ALL_WEEKDAYS, weekday_key, weekday_offset};
use crate::metadata::ScheduleMeta;
use crate::session::{ScheduledSession, SessionStatus, week_label};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub slots: Vec<ScheduledSession>,
}

impl DayRecord {
    pub fn new(date: NaiveDate, theme: impl Into<String>) -> Self {
        Self {
            date,
            theme: theme.into(),
            slots: Vec::new(),
        }
    }
}

/// The seven days of a week record, serialized as a map keyed by weekday name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDays {
    pub monday: DayRecord,
    pub tuesday: DayRecord,
    pub wednesday: DayRecord,
    pub thursday: DayRecord,
    pub friday: DayRecord,
    pub saturday: DayRecord,
    pub sunday: DayRecord,
}

impl WeekDays {
    pub fn from_fn<F>(mut build: F) -> Self
    where
        F: FnMut(Weekday) -> DayRecord,
    {
        Self {
            monday: build(Weekday::Mon),
            tuesday: build(Weekday::Tue),
            wednesday: build(Weekday::Wed),
            thursday: build(Weekday::Thu),
            friday: build(Weekday::Fri),
            saturday: build(Weekday::Sat),
            sunday: build(Weekday::Sun),
        }
    }

    pub fn get(&self, day: Weekday) -> &DayRecord {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn get_mut(&mut self, day: Weekday) -> &mut DayRecord {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    /// Days in calendar-week order, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayRecord)> {
        ALL_WEEKDAYS.into_iter().map(move |day| (day, self.get(day)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRecord {
    pub week_number: u32,
    pub start_date: NaiveDate,
    pub days: WeekDays,
}

impl WeekRecord {
    pub fn session_count(&self) -> usize {
        self.days.iter().map(|(_, day)| day.slots.len()).sum()
    }
}

/// A scheduled session together with the context of the day and week
/// it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRef<'a> {
    pub week_number: u32,
    pub weekday: Weekday,
    pub date: NaiveDate,
    pub theme: &'a str,
    pub session: &'a ScheduledSession,
}

impl<'a> SessionRef<'a> {
    pub fn start(&self) -> NaiveDateTime {
        self.session.start_on(self.date)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.session.end_on(self.date)
    }

    pub fn week_context(&self) -> Cow<'a, str> {
        match &self.session.week_context {
            Some(context) => Cow::Borrowed(context.as_str()),
            None => Cow::Owned(week_label(self.week_number)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleDocumentError {
    #[error("metadata announces {announced} weeks but the document holds {actual}")]
    WeekCountMismatch { announced: u32, actual: usize },
    #[error("week number {found} out of sequence, expected {expected}")]
    WeekOutOfSequence { expected: u32, found: u32 },
    #[error("week {week} starts on {found}, expected {expected}")]
    WeekStartMismatch {
        week: u32,
        expected: NaiveDate,
        found: NaiveDate,
    },
    #[error("{day} of week {week} is dated {found}, expected {expected}")]
    DayDateMismatch {
        week: u32,
        day: &'static str,
        expected: NaiveDate,
        found: NaiveDate,
    },
}

/// The dated, multi-week plan that generation produces and every later
/// step (export, queries, status tracking) reads back from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub meta: ScheduleMeta,
    #[serde(default)]
    pub weeks: Vec<WeekRecord>,
}

impl ScheduleDocument {
    pub fn new(meta: ScheduleMeta) -> Self {
        Self {
            meta,
            weeks: Vec::new(),
        }
    }

    /// Every session in document order: weeks, then Monday..Sunday, then slots.
    pub fn sessions(&self) -> impl Iterator<Item = SessionRef<'_>> {
        self.weeks.iter().flat_map(|week| {
            week.days.iter().flat_map(move |(weekday, day)| {
                day.slots.iter().map(move |session| SessionRef {
                    week_number: week.week_number,
                    weekday,
                    date: day.date,
                    theme: day.theme.as_str(),
                    session,
                })
            })
        })
    }

    pub fn session_count(&self) -> usize {
        self.weeks.iter().map(WeekRecord::session_count).sum()
    }

    pub fn exported_session_count(&self) -> usize {
        self.sessions()
            .filter(|entry| entry.session.status.is_exported())
            .count()
    }

    pub fn find_day(&self, date: NaiveDate) -> Option<(&WeekRecord, Weekday, &DayRecord)> {
        self.weeks.iter().find_map(|week| {
            week.days
                .iter()
                .find(|(_, day)| day.date == date)
                .map(|(weekday, day)| (week, weekday, day))
        })
    }

    /// Updates every session on `date` at `time` with the given specialist.
    /// Returns how many sessions matched.
    pub fn set_status(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
        specialist: &str,
        status: SessionStatus,
        notes: Option<&str>,
    ) -> usize {
        let mut updated = 0;
        for week in &mut self.weeks {
            for weekday in ALL_WEEKDAYS {
                let day = week.days.get_mut(weekday);
                if day.date != date {
                    continue;
                }
                for slot in day
                    .slots
                    .iter_mut()
                    .filter(|slot| slot.time == time && slot.specialist == specialist)
                {
                    slot.status = status;
                    if let Some(notes) = notes {
                        slot.notes = notes.to_string();
                    }
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Checks the week and day date invariants.
    pub fn validate(&self) -> Result<(), ScheduleDocumentError> {
        if self.meta.weeks as usize != self.weeks.len() {
            return Err(ScheduleDocumentError::WeekCountMismatch {
                announced: self.meta.weeks,
                actual: self.weeks.len(),
            });
        }
        for (idx, week) in self.weeks.iter().enumerate() {
            let expected_number = idx as u32 + 1;
            if week.week_number != expected_number {
                return Err(ScheduleDocumentError::WeekOutOfSequence {
                    expected: expected_number,
                    found: week.week_number,
                });
            }
            let expected_start = self.meta.start_date + Duration::weeks(idx as i64);
            if week.start_date != expected_start {
                return Err(ScheduleDocumentError::WeekStartMismatch {
                    week: week.week_number,
                    expected: expected_start,
                    found: week.start_date,
                });
            }
            for (weekday, day) in week.days.iter() {
                let expected = week.start_date + Duration::days(weekday_offset(weekday));
                if day.date != expected {
                    return Err(ScheduleDocumentError::DayDateMismatch {
                        week: week.week_number,
                        day: weekday_key(weekday),
                        expected,
                        found: day.date,
                    });
                }
            }
        }
        Ok(())
    }
}

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::calendar::hhmm;

/// Lifecycle of a scheduled session. Only `Skipped` affects export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Skipped,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Planned,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Skipped => "skipped",
        }
    }

    pub fn is_exported(&self) -> bool {
        !matches!(self, SessionStatus::Skipped)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown session status '{0}' (expected planned, in-progress, completed or skipped)")]
pub struct UnknownStatus(pub String);

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One dated slot in a schedule document. The date lives on the parent day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSession {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Minutes.
    pub duration: u32,
    pub specialist: String,
    pub topic: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_context: Option<String>,
}

impl ScheduledSession {
    pub fn new(
        time: NaiveTime,
        duration: u32,
        specialist: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            time,
            duration,
            specialist: specialist.into(),
            topic: topic.into(),
            status: SessionStatus::Planned,
            notes: String::new(),
            week_context: None,
        }
    }

    pub fn with_week_context(mut self, context: impl Into<String>) -> Self {
        self.week_context = Some(context.into());
        self
    }

    pub fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.time)
    }

    pub fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        self.start_on(date) + Duration::minutes(i64::from(self.duration))
    }
}

pub fn week_label(week_number: u32) -> String {
    format!("Week {week_number}")
}

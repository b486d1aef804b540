//! Read-only lookups over a schedule document.

use chrono::{NaiveDate, NaiveDateTime};

use crate::schedule::{ScheduleDocument, SessionRef};
use crate::session::SessionStatus;

/// Sessions dated `date`, in the order they appear in the document.
pub fn sessions_on(document: &ScheduleDocument, date: NaiveDate) -> Vec<SessionRef<'_>> {
    document
        .sessions()
        .filter(|entry| entry.date == date)
        .collect()
}

/// Earliest still-planned session starting at or after `now`.
pub fn next_session(document: &ScheduleDocument, now: NaiveDateTime) -> Option<SessionRef<'_>> {
    document
        .sessions()
        .filter(|entry| {
            entry.session.status == SessionStatus::Planned && entry.start() >= now
        })
        .min_by_key(|entry| entry.start())
}

pub fn sessions_for_specialist<'a>(
    document: &'a ScheduleDocument,
    specialist: &str,
) -> Vec<SessionRef<'a>> {
    document
        .sessions()
        .filter(|entry| entry.session.specialist == specialist)
        .collect()
}

//! iCalendar (RFC 5545) export of schedule documents.
//!
//! The export is a pure function of the document: the same document always
//! produces the same bytes. Event times are written as floating local time
//! (`YYYYMMDDTHHMMSS`, no `Z`) and the document's timezone name is only
//! passed along as `X-WR-TIMEZONE`.

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::persistence::{PersistenceError, PersistenceResult};
use crate::schedule::{ScheduleDocument, SessionRef};
use crate::specialist;

pub const PRODUCT_ID: &str = "-//growth-planner//Personal Development Schedule//EN";
pub const CALENDAR_VERSION: &str = "2.0";
pub const UID_DOMAIN: &str = "growth-planner";
pub const CONFIRMED: &str = "CONFIRMED";

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            name: Some("Personal Growth Program".to_string()),
            description: Some("Weekly self-improvement sessions".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub summary: String,
    /// Plain text; line breaks are escaped only when written.
    pub description: String,
    pub category: String,
    pub status: String,
    pub week_number: Option<u32>,
}

impl CalendarEvent {
    fn from_session(sequence: usize, entry: &SessionRef<'_>) -> Self {
        let session = entry.session;
        let name = specialist::display_name(&session.specialist);
        let start = entry.start();

        let mut description = format!(
            "Specialist: {name}\nTopic: {topic}\nWeek: {week}\nDuration: {duration} min\nTheme: {theme}\nStatus: {status}",
            topic = session.topic,
            week = entry.week_context(),
            duration = session.duration,
            theme = entry.theme,
            status = session.status,
        );
        if !session.notes.trim().is_empty() {
            description.push_str("\nNotes: ");
            description.push_str(session.notes.trim());
        }

        Self {
            uid: format!("{sequence:05}-{}@{UID_DOMAIN}", start.format(LOCAL_FORMAT)),
            start,
            end: entry.end(),
            summary: format!("{name}: {}", session.topic),
            description,
            category: name.to_string(),
            status: CONFIRMED.to_string(),
            week_number: Some(entry.week_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarFile {
    pub product_id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub timezone: String,
    /// Written as every event's `DTSTAMP` (UTC).
    pub stamp: NaiveDateTime,
    pub events: Vec<CalendarEvent>,
}

/// Turns every non-skipped session into an event, in document order.
pub fn export_calendar(document: &ScheduleDocument, options: &CalendarOptions) -> CalendarFile {
    let events: Vec<CalendarEvent> = document
        .sessions()
        .filter(|entry| entry.session.status.is_exported())
        .enumerate()
        .map(|(idx, entry)| CalendarEvent::from_session(idx + 1, &entry))
        .collect();

    let skipped = document.session_count() - events.len();
    info!(events = events.len(), skipped, "calendar exported");

    CalendarFile {
        product_id: PRODUCT_ID.to_string(),
        version: CALENDAR_VERSION.to_string(),
        name: options.name.clone(),
        description: options.description.clone(),
        timezone: document.meta.timezone.clone(),
        stamp: document
            .meta
            .generated_at
            .unwrap_or_else(|| document.meta.start_date.and_time(NaiveTime::MIN)),
        events,
    }
}

impl CalendarFile {
    pub fn to_ics(&self) -> String {
        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            format!("VERSION:{}", self.version),
            format!("PRODID:{}", self.product_id),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
            format!("X-WR-TIMEZONE:{}", escape_text(&self.timezone)),
        ];
        if let Some(name) = &self.name {
            lines.push(format!("X-WR-CALNAME:{}", escape_text(name)));
        }
        if let Some(description) = &self.description {
            lines.push(format!("X-WR-CALDESC:{}", escape_text(description)));
        }

        let stamp = self.stamp.format(UTC_FORMAT).to_string();
        for event in &self.events {
            lines.push("BEGIN:VEVENT".to_string());
            lines.push(format!("UID:{}", event.uid));
            lines.push(format!("DTSTAMP:{stamp}"));
            lines.push(format!("DTSTART:{}", event.start.format(LOCAL_FORMAT)));
            lines.push(format!("DTEND:{}", event.end.format(LOCAL_FORMAT)));
            lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
            lines.push(format!("DESCRIPTION:{}", escape_text(&event.description)));
            lines.push(format!("CATEGORIES:{}", escape_text(&event.category)));
            lines.push(format!("STATUS:{}", event.status));
            if let Some(week) = event.week_number {
                lines.push(format!("X-WEEK-NUMBER:{week}"));
            }
            lines.push("END:VEVENT".to_string());
        }
        lines.push("END:VCALENDAR".to_string());

        let mut out = String::new();
        for line in &lines {
            out.push_str(&fold_line(line));
            out.push_str("\r\n");
        }
        out
    }
}

/// Writes the calendar, replacing any previous export at `path`.
pub fn write_calendar<P: AsRef<Path>>(calendar: &CalendarFile, path: P) -> PersistenceResult<()> {
    let path = path.as_ref();
    fs::write(path, calendar.to_ics())?;
    info!(path = %path.display(), events = calendar.events.len(), "calendar written");
    Ok(())
}

/// Reads the events back out of iCalendar text produced by [`CalendarFile::to_ics`].
pub fn parse_events(ics: &str) -> PersistenceResult<Vec<CalendarEvent>> {
    let unfolded = ics
        .replace("\r\n ", "")
        .replace("\r\n\t", "")
        .replace("\n ", "");

    let mut events = Vec::new();
    let mut current: Option<PartialEvent> = None;
    for raw in unfolded.lines() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((head, value)) = line.split_once(':') else {
            return Err(PersistenceError::invalid(format!(
                "calendar line without ':' separator: '{line}'"
            )));
        };
        let name = head.split(';').next().unwrap_or(head).to_ascii_uppercase();
        if name == "BEGIN" && value == "VEVENT" {
            current = Some(PartialEvent::default());
            continue;
        }
        if name == "END" && value == "VEVENT" {
            if let Some(partial) = current.take() {
                events.push(partial.finish()?);
            }
            continue;
        }
        let Some(event) = current.as_mut() else {
            continue;
        };
        match name.as_str() {
            "UID" => event.uid = Some(value.to_string()),
            "DTSTART" => event.start = Some(parse_local(value)?),
            "DTEND" => event.end = Some(parse_local(value)?),
            "SUMMARY" => event.summary = unescape_text(value),
            "DESCRIPTION" => event.description = unescape_text(value),
            "CATEGORIES" => event.category = unescape_text(value),
            "STATUS" => event.status = value.to_string(),
            "X-WEEK-NUMBER" => {
                event.week_number = Some(value.trim().parse::<u32>().map_err(|e| {
                    PersistenceError::invalid(format!("invalid week number '{value}': {e}"))
                })?)
            }
            _ => {}
        }
    }
    Ok(events)
}

#[derive(Default)]
struct PartialEvent {
    uid: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    summary: String,
    description: String,
    category: String,
    status: String,
    week_number: Option<u32>,
}

impl PartialEvent {
    fn finish(self) -> PersistenceResult<CalendarEvent> {
        let missing = |field: &str| PersistenceError::invalid(format!("event without {field}"));
        Ok(CalendarEvent {
            uid: self.uid.ok_or_else(|| missing("UID"))?,
            start: self.start.ok_or_else(|| missing("DTSTART"))?,
            end: self.end.ok_or_else(|| missing("DTEND"))?,
            summary: self.summary,
            description: self.description,
            category: self.category,
            status: self.status,
            week_number: self.week_number,
        })
    }
}

fn parse_local(value: &str) -> PersistenceResult<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, LOCAL_FORMAT)
        .map_err(|e| PersistenceError::invalid(format!("invalid calendar timestamp '{value}': {e}")))
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a content line into 75-octet chunks without breaking UTF-8
/// sequences. Continuation lines start with a single space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 3 * (line.len() / MAX_LINE_OCTETS));
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out
}

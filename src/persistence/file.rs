use super::{PersistenceError, PersistenceResult};
use crate::{
    ScheduleDocument, ScheduleMeta,
    calendar::{weekday_from_key, weekday_key, weekday_offset},
    schedule::{DayRecord, WeekDays, WeekRecord},
    session::{ScheduledSession, week_label},
    specialist,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// On-disk encoding of a schedule document, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Either document shape: a `weeks` list, or weekday keys next to `meta`
/// describing a single week.
#[derive(Deserialize)]
struct RawDocument {
    meta: RawMeta,
    #[serde(default)]
    weeks: Option<Vec<WeekRecord>>,
    #[serde(flatten)]
    days: BTreeMap<String, FlatDay>,
}

/// Header as found on disk. The week count may be missing or spelled
/// `num_weeks`; when missing it is taken from the document body.
#[derive(Deserialize)]
struct RawMeta {
    #[serde(default, alias = "num_weeks")]
    weeks: Option<u32>,
    #[serde(flatten)]
    meta: ScheduleMeta,
}

#[derive(Deserialize)]
struct FlatDay {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    slots: Vec<ScheduledSession>,
}

impl RawDocument {
    fn into_document(self) -> PersistenceResult<ScheduleDocument> {
        let RawDocument {
            meta: RawMeta {
                weeks: announced,
                mut meta,
            },
            weeks,
            days,
        } = self;

        let document = match weeks {
            Some(weeks) => {
                if let Some(key) = days.keys().next() {
                    return Err(PersistenceError::invalid(format!(
                        "unexpected top-level key '{key}' next to 'weeks'"
                    )));
                }
                meta.weeks = announced.unwrap_or(weeks.len() as u32);
                ScheduleDocument { meta, weeks }
            }
            None if days.is_empty() => {
                return Err(PersistenceError::invalid(
                    "document has neither 'weeks' nor weekday entries",
                ));
            }
            None => {
                let start = meta.start_date;
                let mut week_days = WeekDays::from_fn(|weekday| {
                    DayRecord::new(start + Duration::days(weekday_offset(weekday)), "")
                });
                for (key, flat) in days {
                    let weekday = weekday_from_key(&key).ok_or_else(|| {
                        PersistenceError::invalid(format!("unknown weekday key '{key}'"))
                    })?;
                    let day = week_days.get_mut(weekday);
                    if let Some(date) = flat.date {
                        day.date = date;
                    }
                    day.theme = flat.theme;
                    day.slots = flat
                        .slots
                        .into_iter()
                        .map(|mut slot| {
                            slot.week_context.get_or_insert_with(|| week_label(1));
                            slot
                        })
                        .collect();
                }
                debug!("read single-week schedule document");
                meta.weeks = 1;
                ScheduleDocument {
                    meta,
                    weeks: vec![WeekRecord {
                        week_number: 1,
                        start_date: start,
                        days: week_days,
                    }],
                }
            }
        };

        document
            .validate()
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        Ok(document)
    }
}

pub fn parse_schedule(source: &str, format: DocumentFormat) -> PersistenceResult<ScheduleDocument> {
    let raw: RawDocument = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(source)?,
        DocumentFormat::Json => serde_json::from_str(source)?,
    };
    raw.into_document()
}

/// Reads a schedule document. A missing file is reported as
/// [`PersistenceError::NotFound`] since nothing downstream can run without it.
pub fn load_schedule<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PersistenceError::NotFound(path.to_path_buf()));
    }
    let source = fs::read_to_string(path)?;
    let document = parse_schedule(&source, DocumentFormat::from_path(path))?;
    info!(
        path = %path.display(),
        weeks = document.weeks.len(),
        sessions = document.session_count(),
        "schedule loaded"
    );
    Ok(document)
}

/// Writes the multi-week form. The document is validated and fully
/// serialized before the target is touched, so a failed save leaves the
/// previous file in place.
pub fn save_schedule<P: AsRef<Path>>(document: &ScheduleDocument, path: P) -> PersistenceResult<()> {
    let path = path.as_ref();
    document
        .validate()
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    let contents = match DocumentFormat::from_path(path) {
        DocumentFormat::Yaml => serde_yaml::to_string(document)?,
        DocumentFormat::Json => serde_json::to_string_pretty(document)?,
    };
    fs::write(path, contents)?;
    info!(path = %path.display(), weeks = document.weeks.len(), "schedule saved");
    Ok(())
}

#[derive(Debug, Serialize)]
struct SessionCsvRecord<'a> {
    week: u32,
    weekday: &'static str,
    date: String,
    time: String,
    duration: u32,
    specialist: &'a str,
    specialist_name: &'a str,
    topic: &'a str,
    status: &'static str,
    week_context: String,
    theme: &'a str,
    notes: &'a str,
}

pub fn write_sessions_csv<W: Write>(document: &ScheduleDocument, writer: W) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for entry in document.sessions() {
        let session = entry.session;
        writer.serialize(SessionCsvRecord {
            week: entry.week_number,
            weekday: weekday_key(entry.weekday),
            date: entry.date.format("%Y-%m-%d").to_string(),
            time: session.time.format("%H:%M").to_string(),
            duration: session.duration,
            specialist: &session.specialist,
            specialist_name: specialist::display_name(&session.specialist),
            topic: &session.topic,
            status: session.status.as_str(),
            week_context: entry.week_context().into_owned(),
            theme: entry.theme,
            notes: &session.notes,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Flat one-row-per-session table for spreadsheets.
pub fn save_sessions_to_csv<P: AsRef<Path>>(
    document: &ScheduleDocument,
    path: P,
) -> PersistenceResult<()> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    write_sessions_csv(document, &mut buffer)?;
    fs::write(path, buffer)?;
    info!(
        path = %path.display(),
        sessions = document.session_count(),
        "sessions exported to csv"
    );
    Ok(())
}

use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Utc, Weekday};
use tracing::{debug, info, warn};

use crate::calendar::{shift_time, weekday_offset};
use crate::metadata::ScheduleMeta;
use crate::progression::ProgressionTable;
use crate::schedule::{DayRecord, ScheduleDocument, WeekDays, WeekRecord};
use crate::session::{ScheduledSession, week_label};
use crate::template::TemplateStore;

/// Everything a generation run needs besides the templates and progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// First day of the plan paired with the reference time that all
    /// session offsets are applied to.
    pub start: NaiveDateTime,
    pub weeks: u32,
    /// IANA name, stored as-is.
    pub timezone: String,
    pub owner: String,
}

impl GenerationRequest {
    pub fn new(start: NaiveDateTime, weeks: u32, timezone: impl Into<String>) -> Self {
        Self {
            start,
            weeks,
            timezone: timezone.into(),
            owner: String::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

pub struct ScheduleGenerator<'a> {
    templates: &'a TemplateStore,
    progression: &'a ProgressionTable,
    generated_at: Option<NaiveDateTime>,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(templates: &'a TemplateStore, progression: &'a ProgressionTable) -> Self {
        Self {
            templates,
            progression,
            generated_at: None,
        }
    }

    /// Freezes the generation timestamp instead of reading the clock.
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Expands the weekly templates into `request.weeks` dated weeks.
    ///
    /// Offsets are taken against the global reference time, so a slot keeps
    /// the same time of day every week while its date advances. Offsets that
    /// cross midnight wrap and stay on the template's day.
    pub fn generate(&self, request: &GenerationRequest) -> ScheduleDocument {
        let start_date = request.start.date();
        let reference = request.start.time();
        if start_date.weekday() != Weekday::Mon {
            warn!(
                start_date = %start_date,
                weekday = %start_date.weekday(),
                "start date is not a Monday; day keys will not match calendar weekdays"
            );
        }

        let mut meta = ScheduleMeta::new(start_date, reference, request.weeks);
        meta.owner = request.owner.clone();
        meta.timezone = request.timezone.clone();
        meta.generated_at = Some(self.generated_at.unwrap_or_else(|| {
            let now = Utc::now().naive_utc();
            now.with_nanosecond(0).unwrap_or(now)
        }));

        let mut document = ScheduleDocument::new(meta);
        for week_number in 1..=request.weeks {
            let week_start = start_date + Duration::weeks(i64::from(week_number - 1));
            let label = week_label(week_number);
            let days = WeekDays::from_fn(|weekday| {
                let template = self.templates.day(weekday);
                let mut day = DayRecord::new(
                    week_start + Duration::days(weekday_offset(weekday)),
                    template.theme.clone(),
                );
                day.slots = template
                    .sessions
                    .iter()
                    .map(|slot| {
                        let topic =
                            self.progression
                                .resolve_topic(&slot.specialist, week_number, &slot.topic);
                        ScheduledSession::new(
                            shift_time(reference, slot.offset),
                            slot.duration,
                            slot.specialist.clone(),
                            topic,
                        )
                        .with_week_context(label.clone())
                    })
                    .collect();
                day
            });
            let week = WeekRecord {
                week_number,
                start_date: week_start,
                days,
            };
            debug!(
                week = week_number,
                start = %week_start,
                sessions = week.session_count(),
                "generated week"
            );
            document.weeks.push(week);
        }

        info!(
            weeks = request.weeks,
            sessions = document.session_count(),
            start = %request.start,
            timezone = %request.timezone,
            "schedule generated"
        );
        document
    }
}

/// Generates with the built-in template catalog.
pub fn generate(
    start: NaiveDateTime,
    weeks: u32,
    timezone: &str,
    progression: &ProgressionTable,
) -> ScheduleDocument {
    ScheduleGenerator::new(TemplateStore::builtin(), progression)
        .generate(&GenerationRequest::new(start, weeks, timezone))
}

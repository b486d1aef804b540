pub mod calendar;
pub mod export;
pub mod generator;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod progression;
pub mod query;
pub mod schedule;
pub mod session;
pub mod specialist;
pub mod template;

pub use export::{
    CalendarEvent, CalendarFile, CalendarOptions, export_calendar, parse_events, write_calendar,
};
pub use generator::{GenerationRequest, ScheduleGenerator, generate};
pub use metadata::ScheduleMeta;
pub use persistence::{
    DocumentFormat, PersistenceError, PersistenceResult, load_schedule, parse_schedule,
    save_schedule, save_sessions_to_csv,
};
pub use progression::{ProgressionTable, TopicProgression};
pub use schedule::{
    DayRecord, ScheduleDocument, ScheduleDocumentError, SessionRef, WeekDays, WeekRecord,
};
pub use session::{ScheduledSession, SessionStatus};
pub use template::{DayTemplate, SessionTemplate, TemplateStore};

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::calendar::{ALL_WEEKDAYS, weekday_key};
use crate::persistence::{PersistenceError, PersistenceResult};

const BUILTIN_TEMPLATES: &str = include_str!("../data/templates.yaml");

static BUILTIN: LazyLock<TemplateStore> = LazyLock::new(|| {
    TemplateStore::from_yaml_str(BUILTIN_TEMPLATES).expect("embedded templates.yaml is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTemplate {
    pub specialist: String,
    /// Minutes relative to the run's reference time; negative values land earlier.
    pub offset: i64,
    /// Minutes.
    pub duration: u32,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub theme: String,
    #[serde(default)]
    pub sessions: Vec<SessionTemplate>,
}

/// Immutable weekly catalog: one day template per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStore {
    monday: DayTemplate,
    tuesday: DayTemplate,
    wednesday: DayTemplate,
    thursday: DayTemplate,
    friday: DayTemplate,
    saturday: DayTemplate,
    sunday: DayTemplate,
}

impl TemplateStore {
    /// The catalog shipped with the crate.
    pub fn builtin() -> &'static TemplateStore {
        &BUILTIN
    }

    pub fn from_yaml_str(source: &str) -> PersistenceResult<Self> {
        let store: TemplateStore = serde_yaml::from_str(source)?;
        store.validate()?;
        Ok(store)
    }

    /// Loads a custom catalog. Unlike progression data, templates are
    /// mandatory, so a missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PersistenceError::TemplatesNotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn day(&self, day: Weekday) -> &DayTemplate {
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

    pub fn sessions_per_week(&self) -> usize {
        ALL_WEEKDAYS
            .into_iter()
            .map(|day| self.day(day).sessions.len())
            .sum()
    }

    fn validate(&self) -> PersistenceResult<()> {
        for day in ALL_WEEKDAYS {
            for session in &self.day(day).sessions {
                if session.specialist.trim().is_empty() {
                    return Err(PersistenceError::invalid(format!(
                        "{} template has a session without a specialist",
                        weekday_key(day)
                    )));
                }
                if session.duration == 0 {
                    return Err(PersistenceError::invalid(format!(
                        "{} template session for '{}' has zero duration",
                        weekday_key(day),
                        session.specialist
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_every_weekday() {
        let store = TemplateStore::builtin();
        assert_eq!(store.sessions_per_week(), 32);
        let tuesday = &store.day(Weekday::Tue).sessions[0];
        assert_eq!(tuesday.specialist, "fitness-trainer");
        assert_eq!((tuesday.offset, tuesday.duration), (-30, 60));
        assert_eq!(store.day(Weekday::Sun).theme, "Review and recovery");
    }

    #[test]
    fn missing_catalog_is_reported_as_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.yaml");
        match TemplateStore::load(&path) {
            Err(PersistenceError::TemplatesNotFound(reported)) => assert_eq!(reported, path),
            other => panic!("expected TemplatesNotFound, got {other:?}"),
        }
    }
}

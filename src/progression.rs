use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const BUILTIN_PROGRESSION: &str = include_str!("../data/progression.yaml");

static BUILTIN: LazyLock<ProgressionTable> = LazyLock::new(|| {
    ProgressionTable::from_yaml_str(BUILTIN_PROGRESSION).expect("embedded progression.yaml is valid")
});

/// Topics for one specialist across weeks.
///
/// Both encodings found in progression files are accepted; callers only see
/// [`ProgressionTable::resolve_topic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicProgression {
    /// Explicit week number to topic. Weeks without an entry use the default.
    ByWeek(BTreeMap<u32, String>),
    /// Topic for week `n` is element `(n - 1) % len`.
    Cycle(Vec<String>),
}

impl TopicProgression {
    pub fn topic_for_week(&self, week_number: u32) -> Option<&str> {
        match self {
            TopicProgression::ByWeek(topics) => topics.get(&week_number).map(String::as_str),
            TopicProgression::Cycle(topics) => {
                if topics.is_empty() || week_number == 0 {
                    return None;
                }
                let idx = (week_number as usize - 1) % topics.len();
                Some(topics[idx].as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressionTable {
    entries: HashMap<String, TopicProgression>,
}

impl ProgressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Eight-week cycles shipped with the crate for the core specialists.
    pub fn builtin() -> &'static ProgressionTable {
        &BUILTIN
    }

    /// Reads a progression file.
    ///
    /// Progression only refines topics, so a missing or malformed file yields
    /// an empty table and every lookup falls back to template defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                info!(
                    path = %path.display(),
                    error = %err,
                    "progression table unavailable, using template topics"
                );
                return Self::new();
            }
        };
        match Self::from_yaml_str(&source) {
            Ok(table) => {
                debug!(path = %path.display(), specialists = table.len(), "loaded progression table");
                table
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "malformed progression table ignored, using template topics"
                );
                Self::new()
            }
        }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        if source.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_yaml::from_str(source)
    }

    pub fn insert(&mut self, specialist: impl Into<String>, progression: TopicProgression) {
        self.entries.insert(specialist.into(), progression);
    }

    pub fn get(&self, specialist: &str) -> Option<&TopicProgression> {
        self.entries.get(specialist)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Topic for `specialist` in `week_number`, or `default_topic` when the
    /// table has nothing for that pair.
    pub fn resolve_topic<'a>(
        &'a self,
        specialist: &str,
        week_number: u32,
        default_topic: &'a str,
    ) -> &'a str {
        self.entries
            .get(specialist)
            .and_then(|progression| progression.topic_for_week(week_number))
            .unwrap_or(default_topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
psychologist:
  1: Triggers
  3: Reframing
executive-coach:
  - Priorities
  - Delegation
"#;

    #[test]
    fn week_keyed_entries_fall_back_to_default() {
        let table = ProgressionTable::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(table.resolve_topic("psychologist", 1, "Default"), "Triggers");
        assert_eq!(table.resolve_topic("psychologist", 2, "Default"), "Default");
        assert_eq!(table.resolve_topic("psychologist", 3, "Default"), "Reframing");
    }

    #[test]
    fn sequences_wrap_around() {
        let table = ProgressionTable::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(table.resolve_topic("executive-coach", 1, "Default"), "Priorities");
        assert_eq!(table.resolve_topic("executive-coach", 2, "Default"), "Delegation");
        assert_eq!(table.resolve_topic("executive-coach", 3, "Default"), "Priorities");
    }

    #[test]
    fn unknown_specialist_and_empty_cycle_use_default() {
        let mut table = ProgressionTable::new();
        table.insert("nutritionist", TopicProgression::Cycle(Vec::new()));
        assert_eq!(table.resolve_topic("nutritionist", 1, "Meal prep"), "Meal prep");
        assert_eq!(table.resolve_topic("astronaut", 4, "Orbit"), "Orbit");
    }

    #[test]
    fn builtin_table_cycles_every_eight_weeks() {
        let table = ProgressionTable::builtin();
        assert_eq!(table.len(), 5);
        assert_eq!(
            table.resolve_topic("psychologist", 2, "Default"),
            "Working with emotions and stress"
        );
        assert_eq!(
            table.resolve_topic("life-coach", 9, "Default"),
            table.resolve_topic("life-coach", 1, "Default")
        );
        assert_eq!(table.resolve_topic("mentor", 2, "Default"), "Default");
    }

    #[test]
    fn malformed_yaml_is_an_error_for_the_parser() {
        assert!(ProgressionTable::from_yaml_str("psychologist: [unclosed").is_err());
        assert!(ProgressionTable::from_yaml_str("   ").unwrap().is_empty());
    }
}

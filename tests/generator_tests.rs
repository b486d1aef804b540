use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use growth_planner::calendar::ALL_WEEKDAYS;
use growth_planner::{
    CalendarOptions, GenerationRequest, ProgressionTable, ScheduleGenerator, SessionStatus,
    TemplateStore, TopicProgression, export_calendar, generate,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn at(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

fn frozen() -> NaiveDateTime {
    at(d(2026, 2, 10), t(9, 0))
}

const MONDAY_ONLY: &str = r#"
monday:
  theme: Mind and emotional balance
  sessions:
    - specialist: meditation-guide
      offset: 0
      duration: 30
      topic: Breath awareness basics
tuesday: { theme: Rest }
wednesday: { theme: Rest }
thursday: { theme: Rest }
friday: { theme: Rest }
saturday: { theme: Rest }
sunday: { theme: Rest }
"#;

#[test]
fn single_monday_session_lands_on_start_date() {
    let templates = TemplateStore::from_yaml_str(MONDAY_ONLY).unwrap();
    let progression = ProgressionTable::new();
    let request = GenerationRequest::new(at(d(2026, 2, 16), t(8, 0)), 1, "Asia/Tokyo");
    let doc = ScheduleGenerator::new(&templates, &progression)
        .with_generated_at(frozen())
        .generate(&request);

    assert_eq!(doc.session_count(), 1);
    let monday = &doc.weeks[0].days.monday;
    assert_eq!(monday.date, d(2026, 2, 16));
    let session = &monday.slots[0];
    assert_eq!(session.time, t(8, 0));
    assert_eq!(session.duration, 30);
    assert_eq!(session.specialist, "meditation-guide");
    assert_eq!(session.status, SessionStatus::Planned);
    assert!(session.notes.is_empty());
    assert_eq!(session.week_context.as_deref(), Some("Week 1"));

    let calendar = export_calendar(&doc, &CalendarOptions::default());
    assert_eq!(calendar.events.len(), 1);
    let ics = calendar.to_ics();
    assert!(ics.contains("DTSTART:20260216T080000\r\n"));
    assert!(ics.contains("DTEND:20260216T083000\r\n"));
}

#[test]
fn negative_offset_produces_earlier_time_on_same_day() {
    let doc = generate(
        at(d(2026, 2, 16), t(8, 0)),
        1,
        "Asia/Tokyo",
        &ProgressionTable::new(),
    );
    let tuesday = &doc.weeks[0].days.tuesday;
    assert_eq!(tuesday.date, d(2026, 2, 17));
    let strength = tuesday
        .slots
        .iter()
        .find(|slot| slot.specialist == "fitness-trainer")
        .expect("strength session on tuesday");
    assert_eq!(strength.time, t(7, 30));
    assert_eq!(strength.duration, 60);
}

#[test]
fn weeks_and_days_form_a_contiguous_sequence() {
    let start = d(2026, 2, 16);
    let weeks = 4;
    let doc = generate(at(start, t(8, 0)), weeks, "UTC", &ProgressionTable::new());

    assert_eq!(doc.weeks.len(), weeks as usize);
    assert_eq!(doc.meta.weeks, weeks);
    assert_eq!(
        doc.session_count(),
        weeks as usize * TemplateStore::builtin().sessions_per_week()
    );

    let mut expected = start;
    for (idx, week) in doc.weeks.iter().enumerate() {
        assert_eq!(week.week_number, idx as u32 + 1);
        assert_eq!(week.start_date, start + Duration::weeks(idx as i64));
        let days: Vec<_> = week.days.iter().collect();
        assert_eq!(days.len(), 7);
        for (weekday, day) in days {
            assert_eq!(day.date, expected, "{weekday} of week {}", week.week_number);
            expected += Duration::days(1);
        }
    }
    assert!(doc.validate().is_ok());
}

#[test]
fn slot_times_are_constant_across_weeks() {
    let doc = generate(at(d(2026, 2, 16), t(6, 45)), 3, "UTC", &ProgressionTable::new());
    for weekday in ALL_WEEKDAYS {
        let first: Vec<_> = doc.weeks[0].days.get(weekday).slots.iter().map(|s| s.time).collect();
        for week in &doc.weeks[1..] {
            let times: Vec<_> = week.days.get(weekday).slots.iter().map(|s| s.time).collect();
            assert_eq!(times, first);
        }
    }
    assert_eq!(doc.weeks[2].days.monday.slots[0].time, t(6, 45));
}

#[test]
fn zero_weeks_yields_empty_document_and_calendar() {
    let doc = generate(at(d(2026, 2, 16), t(8, 0)), 0, "UTC", &ProgressionTable::new());
    assert!(doc.weeks.is_empty());
    assert_eq!(doc.session_count(), 0);

    let calendar = export_calendar(&doc, &CalendarOptions::default());
    assert!(calendar.events.is_empty());
    let ics = calendar.to_ics();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(!ics.contains("BEGIN:VEVENT"));
}

#[test]
fn generation_is_idempotent_with_frozen_timestamp() {
    let progression = ProgressionTable::new();
    let request = GenerationRequest::new(at(d(2026, 3, 2), t(8, 0)), 2, "Europe/Berlin")
        .with_owner("Alex");
    let build = || {
        ScheduleGenerator::new(TemplateStore::builtin(), &progression)
            .with_generated_at(frozen())
            .generate(&request)
    };
    let first = serde_yaml::to_string(&build()).unwrap();
    let second = serde_yaml::to_string(&build()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn metadata_carries_request_values() {
    let progression = ProgressionTable::new();
    let request =
        GenerationRequest::new(at(d(2026, 3, 2), t(7, 15)), 2, "America/Bogota").with_owner("Sam");
    let doc = ScheduleGenerator::new(TemplateStore::builtin(), &progression)
        .with_generated_at(frozen())
        .generate(&request);
    assert_eq!(doc.meta.owner, "Sam");
    assert_eq!(doc.meta.timezone, "America/Bogota");
    assert_eq!(doc.meta.start_date, d(2026, 3, 2));
    assert_eq!(doc.meta.start_time, t(7, 15));
    assert_eq!(doc.meta.weeks, 2);
    assert_eq!(doc.meta.generated_at, Some(frozen()));
}

#[test]
fn progression_overrides_topics_per_week() {
    let mut progression = ProgressionTable::new();
    progression.insert(
        "psychologist",
        TopicProgression::ByWeek(BTreeMap::from([(2, "Reframing thoughts".to_string())])),
    );
    progression.insert(
        "executive-coach",
        TopicProgression::Cycle(vec!["Priorities".into(), "Delegation".into()]),
    );
    let doc = generate(at(d(2026, 2, 16), t(8, 0)), 3, "UTC", &progression);

    let topic_of = |week: usize, specialist: &str| {
        doc.weeks[week]
            .days
            .get(Weekday::Mon)
            .slots
            .iter()
            .find(|slot| slot.specialist == specialist)
            .map(|slot| slot.topic.clone())
            .unwrap()
    };

    assert_eq!(topic_of(0, "psychologist"), "Weekly session: current state");
    assert_eq!(topic_of(1, "psychologist"), "Reframing thoughts");
    assert_eq!(topic_of(2, "psychologist"), "Weekly session: current state");

    assert_eq!(topic_of(0, "executive-coach"), "Priorities");
    assert_eq!(topic_of(1, "executive-coach"), "Delegation");
    assert_eq!(topic_of(2, "executive-coach"), "Priorities");

    // No progression entry at all for the meditation guide.
    assert_eq!(topic_of(1, "meditation-guide"), "Morning mindfulness meditation");
}

#[test]
fn builtin_progression_moves_every_session_of_a_specialist() {
    let doc = generate(
        at(d(2026, 2, 16), t(8, 0)),
        2,
        "UTC",
        ProgressionTable::builtin(),
    );
    let topics = |week: usize| -> Vec<String> {
        ALL_WEEKDAYS
            .into_iter()
            .flat_map(|weekday| doc.weeks[week].days.get(weekday).slots.iter())
            .filter(|slot| slot.specialist == "meditation-guide")
            .map(|slot| slot.topic.clone())
            .collect()
    };
    assert_eq!(topics(0).len(), 5);
    assert!(topics(0).iter().all(|topic| topic == "Mindfulness basics"));
    assert!(topics(1).iter().all(|topic| topic == "Working with the breath"));

    // Specialists without a progression keep the template topic.
    assert_eq!(doc.weeks[1].days.thursday.slots[2].topic, "Mentoring session: long-term vision");
}

#[test]
fn start_date_off_monday_is_accepted() {
    let doc = generate(at(d(2026, 2, 18), t(8, 0)), 1, "UTC", &ProgressionTable::new());
    assert_eq!(doc.weeks[0].days.monday.date, d(2026, 2, 18));
    assert_eq!(doc.weeks[0].days.sunday.date, d(2026, 2, 24));
}

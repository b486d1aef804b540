use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use growth_planner::calendar::{parse_date, parse_time, resolve_start_date, resolve_start_time};
use growth_planner::query::{next_session, sessions_for_specialist, sessions_on};
use growth_planner::{
    CalendarOptions, GenerationRequest, PersistenceError, PersistenceResult, ProgressionTable,
    ScheduleGenerator, SessionRef, SessionStatus, TemplateStore, export_calendar, load_schedule,
    save_schedule, save_sessions_to_csv, specialist, write_calendar,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCHEDULE: &str = "schedule/weekly-schedule.yaml";
const DEFAULT_CALENDAR: &str = "schedule/weekly-schedule.ics";
const DEFAULT_CSV: &str = "schedule/weekly-schedule.csv";

#[derive(Parser)]
#[command(
    name = "growth-planner",
    version,
    about = "Generate, track and export a personal development schedule"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a dated multi-week schedule from the weekly templates
    Generate(GenerateArgs),
    /// Export a schedule document to an iCalendar file
    Export(ExportArgs),
    /// List the sessions of one day (today by default)
    Today(TodayArgs),
    /// Show the next upcoming session
    Next(NextArgs),
    /// Update the status or notes of one session
    Mark(MarkArgs),
    /// Write every session as a CSV row
    Csv(CsvArgs),
    /// List sessions of one specialist
    Specialist(SpecialistArgs),
    /// List known specialists
    Specialists,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(short, long, default_value_t = 1)]
    weeks: u32,
    /// First day of the plan (YYYY-MM-DD, YYYY/MM/DD, DD.MM.YYYY or DD/MM/YYYY); defaults to next Monday
    #[arg(long)]
    start_date: Option<String>,
    /// Reference time that session offsets apply to (HH:MM)
    #[arg(long)]
    start_time: Option<String>,
    #[arg(long, env = "GROWTH_PLANNER_TIMEZONE", default_value = "UTC")]
    timezone: String,
    #[arg(long, env = "GROWTH_PLANNER_OWNER", default_value = "")]
    owner: String,
    /// Topic progression file (YAML); the built-in eight-week cycles are used otherwise
    #[arg(long)]
    progression: Option<PathBuf>,
    /// Custom weekly template catalog (YAML); the built-in one is used otherwise
    #[arg(long)]
    templates: Option<PathBuf>,
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    output: PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
    #[arg(short, long, default_value = DEFAULT_CALENDAR)]
    output: PathBuf,
    #[arg(long)]
    calendar_name: Option<String>,
}

#[derive(Args)]
struct TodayArgs {
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args)]
struct NextArgs {
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
    /// Reference moment (YYYY-MM-DDTHH:MM); defaults to now
    #[arg(long)]
    at: Option<String>,
}

#[derive(Args)]
struct MarkArgs {
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
    #[arg(long)]
    date: String,
    #[arg(long)]
    time: String,
    #[arg(long)]
    specialist: String,
    /// planned, in-progress, completed or skipped
    #[arg(long)]
    status: SessionStatus,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct CsvArgs {
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
    #[arg(short, long, default_value = DEFAULT_CSV)]
    output: PathBuf,
}

#[derive(Args)]
struct SpecialistArgs {
    id: String,
    #[arg(short, long, default_value = DEFAULT_SCHEDULE)]
    input: PathBuf,
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.iter().enumerate() {
        line.push(' ');
        line.push_str(cell);
        let pad = widths[ci].saturating_sub(cell.chars().count());
        if pad > 0 {
            line.push_str(&" ".repeat(pad));
        }
        line.push_str(" |");
    }
    line
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

    // Compute column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&headers, &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row, &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn session_row(entry: &SessionRef<'_>) -> Vec<String> {
    vec![
        entry.date.to_string(),
        format!(
            "{}-{}",
            entry.start().format("%H:%M"),
            entry.end().format("%H:%M")
        ),
        specialist::display_name(&entry.session.specialist).to_string(),
        entry.session.topic.clone(),
        entry.session.status.to_string(),
    ]
}

fn print_sessions(entries: &[SessionRef<'_>]) {
    let rows: Vec<Vec<String>> = entries.iter().map(session_row).collect();
    println!(
        "{}",
        render_text_table(&["date", "time", "specialist", "topic", "status"], &rows)
    );
}

fn ensure_parent_dir(path: &Path) -> PersistenceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> PersistenceResult<()> {
    let today = Local::now().date_naive();
    let date = resolve_start_date(args.start_date.as_deref(), today);
    if date.fallback {
        eprintln!(
            "warning: could not parse start date '{}', using next Monday {}",
            args.start_date.as_deref().unwrap_or_default(),
            date.value
        );
    }
    let time = resolve_start_time(args.start_time.as_deref());
    if time.fallback {
        eprintln!(
            "warning: could not parse start time '{}', using {}",
            args.start_time.as_deref().unwrap_or_default(),
            time.value.format("%H:%M")
        );
    }

    let custom_progression;
    let progression = match &args.progression {
        Some(path) => {
            custom_progression = ProgressionTable::load(path);
            &custom_progression
        }
        None => ProgressionTable::builtin(),
    };
    let custom_templates;
    let templates = match &args.templates {
        Some(path) => {
            custom_templates = TemplateStore::load(path)?;
            &custom_templates
        }
        None => TemplateStore::builtin(),
    };

    let request = GenerationRequest::new(date.value.and_time(time.value), args.weeks, args.timezone)
        .with_owner(args.owner);
    let document = ScheduleGenerator::new(templates, progression).generate(&request);

    ensure_parent_dir(&args.output)?;
    save_schedule(&document, &args.output)?;

    println!("Schedule generated: {}", args.output.display());
    println!(
        "Start    : {} {} ({})",
        document.meta.start_date,
        document.meta.start_time.format("%H:%M"),
        document.meta.timezone
    );
    println!("Weeks    : {}", document.weeks.len());
    println!("Sessions : {}", document.session_count());
    if !progression.is_empty() {
        println!("Progression entries: {}", progression.len());
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> PersistenceResult<()> {
    let document = load_schedule(&args.input)?;
    let mut options = CalendarOptions::default();
    if let Some(name) = args.calendar_name {
        options.name = Some(name);
    }
    let calendar = export_calendar(&document, &options);

    ensure_parent_dir(&args.output)?;
    write_calendar(&calendar, &args.output)?;

    println!("Calendar exported: {}", args.output.display());
    println!("Events created: {}", calendar.events.len());
    println!("Import the file into Google Calendar, Apple Calendar or Outlook.");
    Ok(())
}

fn run_today(args: TodayArgs) -> PersistenceResult<()> {
    let document = load_schedule(&args.input)?;
    let date = match args.date.as_deref() {
        Some(raw) => parse_date(raw)
            .ok_or_else(|| PersistenceError::invalid(format!("invalid date '{raw}'")))?,
        None => Local::now().date_naive(),
    };
    let entries = sessions_on(&document, date);
    if entries.is_empty() {
        println!("No sessions scheduled for {date}.");
        return Ok(());
    }
    if let Some((_, _, day)) = document.find_day(date) {
        println!("{date}: {}", day.theme);
    }
    print_sessions(&entries);
    Ok(())
}

fn run_next(args: NextArgs) -> PersistenceResult<()> {
    let document = load_schedule(&args.input)?;
    let now = match args.at.as_deref() {
        Some(raw) => parse_moment(raw)?,
        None => Local::now().naive_local(),
    };
    match next_session(&document, now) {
        Some(entry) => {
            println!("Next session ({}):", entry.week_context());
            print_sessions(&[entry]);
        }
        None => println!("No upcoming sessions after {}.", now.format("%Y-%m-%d %H:%M")),
    }
    Ok(())
}

fn parse_moment(raw: &str) -> PersistenceResult<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
        .ok_or_else(|| PersistenceError::invalid(format!("invalid date/time '{raw}'")))
}

fn run_mark(args: MarkArgs) -> PersistenceResult<()> {
    let mut document = load_schedule(&args.input)?;
    let date = parse_date(&args.date)
        .ok_or_else(|| PersistenceError::invalid(format!("invalid date '{}'", args.date)))?;
    let time = parse_time(&args.time)
        .ok_or_else(|| PersistenceError::invalid(format!("invalid time '{}'", args.time)))?;

    let updated =
        document.set_status(date, time, &args.specialist, args.status, args.notes.as_deref());
    if updated == 0 {
        return Err(PersistenceError::invalid(format!(
            "no session for '{}' on {date} at {}",
            args.specialist,
            time.format("%H:%M")
        )));
    }
    save_schedule(&document, &args.input)?;
    println!(
        "Marked {} session(s) of {} on {date} at {} as {}.",
        updated,
        specialist::display_name(&args.specialist),
        time.format("%H:%M"),
        args.status
    );
    Ok(())
}

fn run_csv(args: CsvArgs) -> PersistenceResult<()> {
    let document = load_schedule(&args.input)?;
    ensure_parent_dir(&args.output)?;
    save_sessions_to_csv(&document, &args.output)?;
    println!(
        "Sessions written: {} ({} rows)",
        args.output.display(),
        document.session_count()
    );
    Ok(())
}

fn run_specialist(args: SpecialistArgs) -> PersistenceResult<()> {
    let document = load_schedule(&args.input)?;
    let entries = sessions_for_specialist(&document, &args.id);
    if entries.is_empty() {
        println!("No sessions with {}.", specialist::display_name(&args.id));
        return Ok(());
    }
    print_sessions(&entries);
    Ok(())
}

fn print_specialists() {
    println!("Known specialists:");
    for (id, name) in specialist::all() {
        println!("  {:<22} {}", id, name);
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Export(args) => run_export(args),
        Command::Today(args) => run_today(args),
        Command::Next(args) => run_next(args),
        Command::Mark(args) => run_mark(args),
        Command::Csv(args) => run_csv(args),
        Command::Specialist(args) => run_specialist(args),
        Command::Specialists => {
            print_specialists();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(PersistenceError::NotFound(path)) => {
            eprintln!(
                "error: schedule document {} not found; run `growth-planner generate` first",
                path.display()
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::calendar::{parse_date, parse_time, weekday_key};
use crate::query::{next_session, sessions_on};
use crate::{
    CalendarOptions, PersistenceError, ScheduleDocument, SessionRef, SessionStatus,
    export_calendar, save_schedule, specialist,
};

#[derive(Clone)]
pub struct AppState {
    document: Arc<RwLock<ScheduleDocument>>,
    path: Option<Arc<PathBuf>>,
}

impl AppState {
    /// Serves an in-memory document; status updates are not persisted.
    pub fn new(document: ScheduleDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
            path: None,
        }
    }

    /// Serves a document loaded from `path` and writes status updates back to it.
    pub fn with_path(document: ScheduleDocument, path: impl Into<PathBuf>) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
            path: Some(Arc::new(path.into())),
        }
    }

    fn document(&self) -> Arc<RwLock<ScheduleDocument>> {
        self.document.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// Session as returned by the API, with its day and week context inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub date: NaiveDate,
    pub weekday: String,
    pub time: String,
    pub end: String,
    pub duration: u32,
    pub specialist: String,
    pub specialist_name: String,
    pub topic: String,
    pub status: SessionStatus,
    pub notes: String,
    pub week_number: u32,
    pub week_context: String,
    pub theme: String,
}

impl From<&SessionRef<'_>> for SessionView {
    fn from(entry: &SessionRef<'_>) -> Self {
        let session = entry.session;
        Self {
            date: entry.date,
            weekday: weekday_key(entry.weekday).to_string(),
            time: session.time.format("%H:%M").to_string(),
            end: entry.end().format("%H:%M").to_string(),
            duration: session.duration,
            specialist: session.specialist.clone(),
            specialist_name: specialist::display_name(&session.specialist).to_string(),
            topic: session.topic.clone(),
            status: session.status,
            notes: session.notes.clone(),
            week_number: entry.week_number,
            week_context: entry.week_context().into_owned(),
            theme: entry.theme.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub date: NaiveDate,
    pub time: String,
    pub specialist: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule", get(get_schedule))
        .route("/calendar.ics", get(get_calendar))
        .route("/sessions", get(list_sessions))
        .route("/sessions/next", get(get_next_session))
        .route("/sessions/status", post(update_status))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleDocument> {
    let document = state.document();
    let snapshot = {
        let guard = document.read();
        guard.clone()
    };
    Json(snapshot)
}

async fn get_calendar(State(state): State<AppState>) -> Response {
    let document = state.document();
    let ics = {
        let guard = document.read();
        export_calendar(&guard, &CalendarOptions::default()).to_ics()
    };
    (
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
        ics,
    )
        .into_response()
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => {
            parse_date(raw).ok_or_else(|| ApiError::invalid(format!("invalid date '{raw}'")))?
        }
        None => Local::now().date_naive(),
    };
    let document = state.document();
    let sessions = {
        let guard = document.read();
        sessions_on(&guard, date)
            .iter()
            .map(SessionView::from)
            .collect()
    };
    Ok(Json(sessions))
}

async fn get_next_session(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Json<SessionView>, ApiError> {
    let now = query.at.unwrap_or_else(|| Local::now().naive_local());
    let document = state.document();
    let next = {
        let guard = document.read();
        next_session(&guard, now).as_ref().map(SessionView::from)
    };
    next.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no sessions after {now}")))
}

async fn update_status(
    State(state): State<AppState>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let time = parse_time(&update.time)
        .ok_or_else(|| ApiError::invalid(format!("invalid time '{}'", update.time)))?;
    let document = state.document();
    let updated = {
        let mut guard = document.write();
        let mut candidate = guard.clone();
        let matched = candidate.set_status(
            update.date,
            time,
            &update.specialist,
            update.status,
            update.notes.as_deref(),
        );
        if matched == 0 {
            return Err(ApiError::not_found(format!(
                "no session for '{}' on {} at {}",
                update.specialist,
                update.date,
                time.format("%H:%M")
            )));
        }
        if let Some(path) = &state.path {
            save_schedule(&candidate, path.as_path())?;
        }
        *guard = candidate;
        sessions_on(&guard, update.date)
            .iter()
            .filter(|entry| {
                entry.session.time == time && entry.session.specialist == update.specialist
            })
            .map(SessionView::from)
            .collect::<Vec<_>>()
    };
    info!(
        date = %update.date,
        specialist = %update.specialist,
        status = %update.status,
        "session status updated"
    );
    Ok(Json(updated))
}

#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, NaiveTime};
use growth_planner::http_api::{self, SessionView};
use growth_planner::{ProgressionTable, ScheduleDocument, SessionStatus, generate, load_schedule};
use serde_json::json;
use tempfile::Builder;
use tower::util::ServiceExt;

fn one_week() -> ScheduleDocument {
    let start = NaiveDate::from_ymd_opt(2026, 2, 16)
        .unwrap()
        .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    generate(start, 1, "UTC", &ProgressionTable::new())
}

fn new_router() -> axum::Router {
    http_api::router(http_api::AppState::new(one_week()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_status(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/sessions/status")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = new_router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(value["status"], "ok");
}

#[tokio::test]
async fn sessions_for_a_day() {
    let response = new_router()
        .oneshot(get("/sessions?date=2026-02-17"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sessions: Vec<SessionView> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(sessions.len(), 4);
    assert_eq!(sessions[0].time, "07:30");
    assert_eq!(sessions[0].end, "08:30");
    assert_eq!(sessions[0].specialist_name, "Fitness Trainer");
    assert_eq!(sessions[0].weekday, "tuesday");
    assert_eq!(sessions[0].week_context, "Week 1");
}

#[tokio::test]
async fn malformed_date_is_rejected() {
    let response = new_router()
        .oneshot(get("/sessions?date=someday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn next_session_from_a_moment() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(get("/sessions/next?at=2026-02-16T08:00:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let next: SessionView = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(next.specialist, "meditation-guide");
    assert_eq!(next.time, "08:00");

    let response = app
        .oneshot(get("/sessions/next?at=2026-03-01T00:00:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn skipping_a_session_removes_it_from_the_calendar() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(post_status(json!({
            "date": "2026-02-17",
            "time": "07:30",
            "specialist": "fitness-trainer",
            "status": "skipped",
            "notes": "Travelling"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Vec<SessionView> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].status, SessionStatus::Skipped);
    assert_eq!(updated[0].notes, "Travelling");

    let response = app.oneshot(get("/calendar.ics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/calendar; charset=utf-8"
    );
    let ics = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 31);
    assert!(!ics.contains("DTSTART:20260217T073000"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let response = new_router()
        .oneshot(post_status(json!({
            "date": "2026-02-17",
            "time": "06:00",
            "specialist": "fitness-trainer",
            "status": "completed"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_update_is_written_back_to_disk() {
    let file = Builder::new().suffix(".yaml").tempfile().unwrap();
    growth_planner::save_schedule(&one_week(), file.path()).unwrap();
    let document = load_schedule(file.path()).unwrap();
    let app = http_api::router(http_api::AppState::with_path(document, file.path()));

    let response = app
        .oneshot(post_status(json!({
            "date": "2026-02-16",
            "time": "08:00",
            "specialist": "meditation-guide",
            "status": "completed"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reloaded = load_schedule(file.path()).unwrap();
    let monday = &reloaded.weeks[0].days.monday.slots[0];
    assert_eq!(monday.status, SessionStatus::Completed);
}

#[tokio::test]
async fn failed_save_leaves_served_document_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let unwritable = dir.path().join("missing-dir").join("schedule.yaml");
    let app = http_api::router(http_api::AppState::with_path(one_week(), unwritable));

    let response = app
        .clone()
        .oneshot(post_status(json!({
            "date": "2026-02-17",
            "time": "07:30",
            "specialist": "fitness-trainer",
            "status": "skipped"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app.clone().oneshot(get("/schedule")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served: ScheduleDocument = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(
        served.weeks[0].days.tuesday.slots[0].status,
        SessionStatus::Planned
    );

    let response = app.oneshot(get("/calendar.ics")).await.unwrap();
    let ics = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(ics.contains("DTSTART:20260217T073000"));
}

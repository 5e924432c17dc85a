use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    DaySchedule, EventData, LessonQueue, LessonStatus, QueueError, QueuedLesson,
    ReorganizationOption, ScheduleError, ScheduleNode, TimeOfDay, TimelineEntry,
    reorganization_options, apply_reorganization, perform_compact_reorganization,
    shift_first_event_and_reorganize,
};

/// One teacher's day as served over HTTP: the committed schedule plus the
/// provisional queue laid out around it.
pub struct DayPlanner {
    pub schedule: DaySchedule,
    pub queue: LessonQueue,
}

impl DayPlanner {
    pub fn new(schedule: DaySchedule) -> Self {
        Self {
            schedule,
            queue: LessonQueue::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    planner: Arc<RwLock<DayPlanner>>,
}

impl AppState {
    pub fn new(schedule: DaySchedule) -> Self {
        Self {
            planner: Arc::new(RwLock::new(DayPlanner::new(schedule))),
        }
    }

    pub fn with_shared(planner: Arc<RwLock<DayPlanner>>) -> Self {
        Self { planner }
    }

    fn planner(&self) -> Arc<RwLock<DayPlanner>> {
        self.planner.clone()
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
    Conflict(String),
    Invalid(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::NodeNotFound { .. } => ApiError::NotFound(value.to_string()),
            ScheduleError::OutOfDay { .. } | ScheduleError::NotEnoughEvents => {
                ApiError::Invalid(value.to_string())
            }
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::UnknownLesson(_) => ApiError::NotFound(value.to_string()),
            QueueError::AlreadyQueued(_) => ApiError::Conflict(value.to_string()),
            QueueError::NotPlannable(_)
            | QueueError::OutOfDay(_)
            | QueueError::NothingToSwap
            | QueueError::NoPredecessor => ApiError::Invalid(value.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Conflict(message) => {
                let body = Json(ErrorBody {
                    error: "conflict",
                    message,
                });
                (StatusCode::CONFLICT, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule", get(get_schedule))
        .route("/schedule/events", post(create_event))
        .route("/schedule/events/:id", delete(delete_event))
        .route(
            "/schedule/events/:id/options",
            get(get_reorganization_options),
        )
        .route("/schedule/reorganize", post(reorganize))
        .route("/schedule/compact", post(compact))
        .route("/schedule/shift", post(shift))
        .route("/queue", get(get_queue))
        .route("/queue/preferred_start", put(set_preferred_start))
        .route("/queue/lessons", post(enqueue_lesson))
        .route("/queue/lessons/:lesson_id", delete(dequeue_lesson))
        .route("/queue/lessons/:lesson_id/duration", post(set_duration))
        .route("/queue/lessons/:lesson_id/start_time", post(nudge_start))
        .route("/queue/lessons/:lesson_id/move_up", post(move_up))
        .route("/queue/lessons/:lesson_id/move_down", post(move_down))
        .route("/queue/lessons/:lesson_id/close_gap", post(close_gap))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, schedule: DaySchedule) -> std::io::Result<()> {
    let state = AppState::new(schedule);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct ScheduleView {
    teacher_id: String,
    teacher_name: String,
    date: NaiveDate,
    timeline: Vec<TimelineEntry>,
}

async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleView> {
    let planner = state.planner();
    let view = {
        let guard = planner.read();
        ScheduleView {
            teacher_id: guard.schedule.teacher_id().to_string(),
            teacher_name: guard.schedule.teacher_name().to_string(),
            date: guard.schedule.date(),
            timeline: guard.schedule.timeline(),
        }
    };
    Json(view)
}

#[derive(Debug, Deserialize)]
struct CreateEventPayload {
    lesson_id: String,
    start: TimeOfDay,
    duration_minutes: u16,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    students: Vec<String>,
}

async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<(StatusCode, Json<ScheduleNode>), ApiError> {
    let planner = state.planner();
    let created = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        if let Some(conflict) = schedule.check_conflict(payload.start, payload.duration_minutes) {
            let message = match conflict.suggested_start {
                Some(slot) => format!(
                    "slot overlaps event {}; next free slot starts at {slot}",
                    conflict.node_id
                ),
                None => format!(
                    "slot overlaps event {} and no later slot fits the day",
                    conflict.node_id
                ),
            };
            return Err(ApiError::Conflict(message));
        }
        let mut event = EventData::new(payload.lesson_id, payload.students.len() as u16);
        event.location = payload.location;
        event.student_names = payload.students;
        let node = schedule
            .add_event(payload.start, payload.duration_minutes, event)
            .map_err(ApiError::from)?
            .clone();
        queue.recompute(schedule).map_err(ApiError::from)?;
        node
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(node_id): Path<u32>,
) -> Result<StatusCode, ApiError> {
    let planner = state.planner();
    {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        schedule.remove_node(node_id).map_err(ApiError::from)?;
        queue.recompute(schedule).map_err(ApiError::from)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_reorganization_options(
    State(state): State<AppState>,
    Path(node_id): Path<u32>,
) -> Result<Json<Vec<ReorganizationOption>>, ApiError> {
    let planner = state.planner();
    let options = {
        let guard = planner.read();
        reorganization_options(&guard.schedule, node_id).map_err(ApiError::from)?
    };
    Ok(Json(options))
}

async fn reorganize(
    State(state): State<AppState>,
    Json(option): Json<ReorganizationOption>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let planner = state.planner();
    let timeline = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        apply_reorganization(schedule, &option).map_err(ApiError::from)?;
        queue.recompute(schedule).map_err(ApiError::from)?;
        schedule.timeline()
    };
    Ok(Json(timeline))
}

async fn compact(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let planner = state.planner();
    let timeline = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        perform_compact_reorganization(schedule).map_err(ApiError::from)?;
        queue.recompute(schedule).map_err(ApiError::from)?;
        schedule.timeline()
    };
    Ok(Json(timeline))
}

#[derive(Debug, Deserialize)]
struct ShiftPayload {
    offset_minutes: i32,
}

async fn shift(
    State(state): State<AppState>,
    Json(payload): Json<ShiftPayload>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let planner = state.planner();
    let timeline = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        shift_first_event_and_reorganize(schedule, payload.offset_minutes)
            .map_err(ApiError::from)?;
        queue.recompute(schedule).map_err(ApiError::from)?;
        schedule.timeline()
    };
    Ok(Json(timeline))
}

#[derive(Debug, Serialize)]
struct QueueView {
    preferred_start: Option<TimeOfDay>,
    global_offset_minutes: i32,
    entries: Vec<QueuedLesson>,
}

async fn get_queue(State(state): State<AppState>) -> Json<QueueView> {
    let planner = state.planner();
    let view = {
        let guard = planner.read();
        QueueView {
            preferred_start: guard.queue.preferred_start(),
            global_offset_minutes: guard.queue.global_offset_minutes(),
            entries: guard.queue.entries().to_vec(),
        }
    };
    Json(view)
}

#[derive(Debug, Deserialize)]
struct PreferredStartPayload {
    start: Option<TimeOfDay>,
}

async fn set_preferred_start(
    State(state): State<AppState>,
    Json(payload): Json<PreferredStartPayload>,
) -> Result<Json<QueueView>, ApiError> {
    let planner = state.planner();
    let view = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .set_preferred_start(schedule, payload.start)
            .map_err(ApiError::from)?;
        QueueView {
            preferred_start: queue.preferred_start(),
            global_offset_minutes: queue.global_offset_minutes(),
            entries: queue.entries().to_vec(),
        }
    };
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct EnqueuePayload {
    lesson_id: String,
    duration_minutes: u16,
    #[serde(default)]
    remaining_minutes: Option<u16>,
    #[serde(default)]
    students: Vec<String>,
    #[serde(default)]
    status: Option<LessonStatus>,
}

async fn enqueue_lesson(
    State(state): State<AppState>,
    Json(payload): Json<EnqueuePayload>,
) -> Result<(StatusCode, Json<QueuedLesson>), ApiError> {
    let planner = state.planner();
    let entry = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        let remaining = payload.remaining_minutes.unwrap_or(payload.duration_minutes);
        queue
            .add_lesson(
                schedule,
                payload.lesson_id.clone(),
                payload.duration_minutes,
                remaining,
                payload.students,
                payload.status,
            )
            .map_err(ApiError::from)?;
        queue
            .find(&payload.lesson_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("lesson not found after enqueue"))?
    };
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn dequeue_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let planner = state.planner();
    {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .remove_lesson(schedule, &lesson_id)
            .map_err(ApiError::from)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct DurationPayload {
    duration_minutes: u16,
}

async fn set_duration(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(payload): Json<DurationPayload>,
) -> Result<Json<QueuedLesson>, ApiError> {
    let planner = state.planner();
    let entry = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .update_duration(schedule, &lesson_id, payload.duration_minutes)
            .map_err(ApiError::from)?;
        queue
            .find(&lesson_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("lesson not found after update"))?
    };
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
struct NudgePayload {
    delta_minutes: i32,
}

async fn nudge_start(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(payload): Json<NudgePayload>,
) -> Result<Json<QueuedLesson>, ApiError> {
    let planner = state.planner();
    let entry = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .adjust_start_time(schedule, &lesson_id, payload.delta_minutes)
            .map_err(ApiError::from)?;
        queue
            .find(&lesson_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("lesson not found after adjustment"))?
    };
    Ok(Json(entry))
}

async fn move_up(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<Json<Vec<QueuedLesson>>, ApiError> {
    let planner = state.planner();
    let entries = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue.move_up(schedule, &lesson_id).map_err(ApiError::from)?;
        queue.entries().to_vec()
    };
    Ok(Json(entries))
}

async fn move_down(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<Json<Vec<QueuedLesson>>, ApiError> {
    let planner = state.planner();
    let entries = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .move_down(schedule, &lesson_id)
            .map_err(ApiError::from)?;
        queue.entries().to_vec()
    };
    Ok(Json(entries))
}

#[derive(Debug, Serialize)]
struct CloseGapResponse {
    closed_minutes: i32,
}

async fn close_gap(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<Json<CloseGapResponse>, ApiError> {
    let planner = state.planner();
    let closed_minutes = {
        let mut guard = planner.write();
        let DayPlanner { schedule, queue } = &mut *guard;
        queue
            .remove_gap_for_lesson(schedule, &lesson_id)
            .map_err(ApiError::from)?
    };
    Ok(Json(CloseGapResponse { closed_minutes }))
}

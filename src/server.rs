use crate::allocator;
use crate::config::Config;
use crate::data::{AllocationOutcome, AllocationRequest, RosterEntry, SeatAssignment};
use crate::error::{ServiceError, ServiceResult};
use crate::export;
use crate::registry::{Classroom, ClassroomRegistry};
use crate::roster;
use crate::store::{MemoryStore, SeatingSink};
use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct AppState {
    pub registry: RwLock<ClassroomRegistry>,
    pub store: RwLock<Box<dyn SeatingSink>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(registry: ClassroomRegistry, store: Box<dyn SeatingSink>) -> SharedState {
        Arc::new(Self {
            registry: RwLock::new(registry),
            store: RwLock::new(store),
        })
    }
}

#[derive(Debug, Serialize)]
struct SeatingBatch {
    key: String,
    assignments: Vec<SeatAssignment>,
}

#[derive(Debug, Deserialize)]
struct NewClassroom {
    name: String,
    #[serde(flatten)]
    room: Classroom,
}

#[derive(Debug, Deserialize)]
struct Resize {
    rows: u32,
    cols: u32,
}

#[derive(Debug, Deserialize)]
struct ColumnsRequest {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    roster: Option<Vec<RosterEntry>>,
}

async fn allocate_handler(
    State(state): State<SharedState>,
    Json(req): Json<AllocationRequest>,
) -> ServiceResult<Json<AllocationOutcome>> {
    if req.subject.trim().is_empty() {
        return Err(ServiceError::Validation("subject is required".into()));
    }
    let candidates = match (&req.roster, &req.candidates) {
        (Some(roster), _) => roster::eligible_candidates(roster, &req.subject),
        (None, Some(ids)) => roster::prepare_candidates(ids),
        (None, None) => {
            return Err(ServiceError::Validation(
                "either candidates or roster must be supplied".into(),
            ));
        }
    };
    let classrooms = match req.classrooms.clone() {
        Some(rooms) => rooms,
        None => state.registry.read().await.specs(),
    };

    let exam = req.exam();
    let outcome = allocator::plan(&candidates, &classrooms, &exam);
    if !req.dry_run {
        state.store.write().await.record(&outcome.assignments);
    }
    Ok(Json(outcome))
}

async fn list_seating(State(state): State<SharedState>) -> Json<Vec<SeatingBatch>> {
    let batches = state
        .store
        .read()
        .await
        .batches()
        .into_iter()
        .map(|(key, assignments)| SeatingBatch { key, assignments })
        .collect();
    Json(batches)
}

async fn clear_seating(State(state): State<SharedState>) -> StatusCode {
    state.store.write().await.clear();
    StatusCode::NO_CONTENT
}

async fn delete_seating(
    State(state): State<SharedState>,
    Path((subject, date)): Path<(String, NaiveDate)>,
) -> ServiceResult<Json<Value>> {
    let removed = state.store.write().await.delete_batch(&subject, date);
    if removed == 0 {
        return Err(ServiceError::NotFound(format!(
            "seating for {} on {}",
            subject, date
        )));
    }
    info!("Deleted seating for {} on {} ({} records)", subject, date, removed);
    Ok(Json(json!({ "removed": removed })))
}

async fn export_seating(
    State(state): State<SharedState>,
    Path((subject, date)): Path<(String, NaiveDate)>,
) -> ServiceResult<impl IntoResponse> {
    let batch = state
        .store
        .read()
        .await
        .batch(&subject, date)
        .ok_or_else(|| ServiceError::NotFound(format!("seating for {} on {}", subject, date)))?;
    let body = export::to_csv(&batch)?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::file_name(&batch)),
        ),
    ];
    Ok((headers, body))
}

async fn student_seating(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<Vec<SeatAssignment>> {
    Json(state.store.read().await.for_candidate(&id))
}

async fn list_classrooms(State(state): State<SharedState>) -> Json<IndexMap<String, Classroom>> {
    Json(state.registry.read().await.list().clone())
}

async fn get_classroom(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ServiceResult<Json<Classroom>> {
    state
        .registry
        .read()
        .await
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(format!("classroom '{}'", name)))
}

async fn create_classroom(
    State(state): State<SharedState>,
    Json(new): Json<NewClassroom>,
) -> ServiceResult<StatusCode> {
    state.registry.write().await.insert(&new.name, new.room)?;
    Ok(StatusCode::CREATED)
}

async fn update_classroom(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(resize): Json<Resize>,
) -> ServiceResult<Json<Classroom>> {
    let mut registry = state.registry.write().await;
    let room = registry.update(&name, resize.rows, resize.cols)?;
    Ok(Json(room.clone()))
}

async fn delete_classroom(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ServiceResult<StatusCode> {
    state.registry.write().await.remove(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn detect_subjects(Json(req): Json<ColumnsRequest>) -> Json<Vec<String>> {
    let columns = match &req.roster {
        Some(entries) => roster::roster_columns(entries),
        None => req.columns,
    };
    Json(roster::detect_subject_columns(&columns))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/seating/allocate", post(allocate_handler))
        .route("/v1/seating", get(list_seating).delete(clear_seating))
        .route("/v1/seating/:subject/:date", delete(delete_seating))
        .route("/v1/seating/:subject/:date/csv", get(export_seating))
        .route("/v1/students/:id/seating", get(student_seating))
        .route("/v1/classrooms", get(list_classrooms).post(create_classroom))
        .route(
            "/v1/classrooms/:name",
            get(get_classroom)
                .put(update_classroom)
                .delete(delete_classroom),
        )
        .route("/v1/roster/subjects", post(detect_subjects))
        .with_state(state)
}

pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let registry = ClassroomRegistry::open(&config.classrooms_file).with_context(|| {
        format!(
            "failed to open classroom registry at {}",
            config.classrooms_file.display()
        )
    })?;
    let state = AppState::new(registry, Box::new(MemoryStore::new()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::jobs::queue::{enqueue_job, Enqueue};
use crate::jobs::JobKind;

pub struct AppState {
    pub pool: sqlx::PgPool,
}

#[derive(Serialize)]
struct JobResponse<'a> {
    status: &'a str,
    job_type: &'a str,
    message: String,
}

pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "TMDB Mirror API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

async fn enqueue_response(state: &AppState, kind: JobKind, queued_message: String) -> HttpResponse {
    match enqueue_job(&state.pool, &kind).await {
        Ok(Enqueue::Queued) => HttpResponse::Accepted().json(JobResponse {
            status: "queued",
            job_type: kind.name(),
            message: queued_message,
        }),
        Ok(Enqueue::AlreadyRunning) => HttpResponse::Conflict().json(JobResponse {
            status: "rejected",
            job_type: kind.name(),
            message: "already running".to_string(),
        }),
        Err(err) => {
            error!(job = kind.name(), error = %err, "enqueue failed");
            HttpResponse::InternalServerError().json(JobResponse {
                status: "error",
                job_type: kind.name(),
                message: err.to_string(),
            })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FullSweepRequest {
    #[serde(default)]
    pub force: bool,
}

pub async fn trigger_full_sweep(
    state: web::Data<AppState>,
    body: Option<web::Json<FullSweepRequest>>,
) -> impl Responder {
    let force = body.map(|b| b.force).unwrap_or(false);
    enqueue_response(
        &state,
        JobKind::FullSweep { force },
        format!("Full sweep job enqueued (force={force})"),
    )
    .await
}

pub async fn trigger_missing_ids(state: web::Data<AppState>) -> impl Responder {
    enqueue_response(
        &state,
        JobKind::MissingIds,
        "Missing ids sync job enqueued".to_string(),
    )
    .await
}

pub async fn trigger_prune_deleted(state: web::Data<AppState>) -> impl Responder {
    enqueue_response(
        &state,
        JobKind::PruneDeleted,
        "Prune deleted records job enqueued".to_string(),
    )
    .await
}

pub async fn trigger_changes_sync(state: web::Data<AppState>) -> impl Responder {
    enqueue_response(
        &state,
        JobKind::ChangesSync,
        "Changes sync job enqueued".to_string(),
    )
    .await
}

pub async fn trigger_create_tables(state: web::Data<AppState>) -> impl Responder {
    enqueue_response(
        &state,
        JobKind::CreateTables,
        "Create tables job enqueued".to_string(),
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct TestWebhookRequest {
    pub message: Option<String>,
}

pub async fn trigger_test_webhook(
    state: web::Data<AppState>,
    body: Option<web::Json<TestWebhookRequest>>,
) -> impl Responder {
    let message = body
        .and_then(|b| b.into_inner().message)
        .unwrap_or_else(|| "Test webhook message from TMDB Mirror API".to_string());
    enqueue_response(
        &state,
        JobKind::TestWebhook(message.clone()),
        format!("Webhook test job enqueued with message: {message}"),
    )
    .await
}

pub async fn add_movie(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let tmdb_id = path.into_inner();
    if tmdb_id <= 0 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "status": "error",
            "message": "TMDB id must be greater than 0",
        }));
    }
    enqueue_response(
        &state,
        JobKind::AddMovie(tmdb_id),
        format!("Movie {tmdb_id} add/update job enqueued"),
    )
    .await
}

pub async fn add_series(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let tmdb_id = path.into_inner();
    if tmdb_id <= 0 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "status": "error",
            "message": "TMDB id must be greater than 0",
        }));
    }
    enqueue_response(
        &state,
        JobKind::AddSeries(tmdb_id),
        format!("Series {tmdb_id} add/update job enqueued"),
    )
    .await
}

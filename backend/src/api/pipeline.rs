use crate::models::{ApiStatus, ErrorResponse, RunRequest, RunSummary};
use crate::services::pipeline::Pipeline;
use crate::AppState;
use log::{info, warn};
use rocket::serde::json::Json;
use rocket::{get, post, State};

#[get("/status")]
pub async fn api_status(state: &State<AppState>) -> Json<ApiStatus> {
    let youtube_api_configured = state.config.api_key.is_some();
    let email_configured = state.config.email_configured();

    let mut missing = Vec::new();
    if !youtube_api_configured {
        missing.push("YOUTUBE_API_KEY");
    }
    if !email_configured {
        missing.push("GMAIL_SENDER_EMAIL/GMAIL_APP_PASSWORD");
    }
    let message = if missing.is_empty() {
        "Ready".to_string()
    } else {
        format!("Missing configuration: {}", missing.join(", "))
    };

    Json(ApiStatus {
        youtube_api_configured,
        email_configured,
        message,
    })
}

#[post("/run", data = "<request>")]
pub async fn run_pipeline(
    state: &State<AppState>,
    request: Json<RunRequest>,
) -> Result<Json<RunSummary>, ErrorResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ErrorResponse {
            error: "invalid_query".to_string(),
            message: "Search query must not be empty".to_string(),
        });
    }
    let recipient = request
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    if state.run_lock.try_lock().is_err() {
        info!("A pipeline run is in progress, waiting for it to finish");
    }
    let _guard = state.run_lock.lock().await;

    info!("Starting pipeline run for query '{query}'");
    let mut pipeline = Pipeline::new(state.config.clone());
    let summary = pipeline
        .run_full_pipeline(request.send_email, Some(query), recipient)
        .await;
    if !summary.succeeded() {
        warn!("Pipeline run for '{query}' did not complete");
    }

    *state.last_run.write().await = Some(summary.clone());
    Ok(Json(summary))
}

#[get("/runs/last")]
pub async fn last_run(state: &State<AppState>) -> Json<Option<RunSummary>> {
    Json(state.last_run.read().await.clone())
}

use crate::error::AppResult;
use crate::models::EngagementEvent;
use crate::state::AppState;
use actix_web::{delete, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

/// Accept an engagement delta for asynchronous ranking.
///
/// Answers `202` once queued and `503` when the queue is full or closed;
/// the request never waits for the ranking update itself.
#[post("/api/v1/engagements")]
pub async fn record_engagement(
    state: web::Data<AppState>,
    body: web::Json<EngagementEvent>,
) -> AppResult<HttpResponse> {
    let event = body.into_inner();
    state.queue.enqueue(event)?;

    Ok(HttpResponse::Accepted().json(json!({
        "status": "queued",
        "video_id": event.entity_id,
    })))
}

#[delete("/api/v1/videos/{id}/ranking")]
pub async fn remove_from_ranking(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let video_id = path.into_inner();
    state.queue.enqueue_removal(video_id)?;

    Ok(HttpResponse::Accepted().json(json!({
        "status": "queued",
        "video_id": video_id,
    })))
}

use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::load_viewer;
use crate::error::CoreError;
use crate::models::{HealthResponse, MatchesResponse, ViewerQuery, ViewerRequest};
use crate::routes::{invalid_request, AppState};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/{match_id}/read", web::post().to(mark_match_read))
        .route("/conversations", web::get().to(conversations));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.ledger.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Matches of the viewer, newest first
///
/// GET /api/v1/matches?viewerId={viewerId}
async fn list_matches(
    state: web::Data<AppState>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &query.viewer_id).await?;
    let matches = state.ledger.recent_matches_for(&viewer.id).await?;

    Ok(HttpResponse::Ok().json(MatchesResponse {
        total: matches.len(),
        matches,
    }))
}

/// Clear the new-match badge
///
/// POST /api/v1/matches/{matchId}/read
async fn mark_match_read(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<ViewerRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let match_id = path.into_inner();

    match state.ledger.get(&match_id).await? {
        Some(record) if record.involves(&viewer.id) => {}
        _ => return Err(CoreError::UnknownMatch(match_id)),
    }

    let updated = state.ledger.mark_match_read(&match_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Inbox: one entry per match with last message and unread count
///
/// GET /api/v1/conversations?viewerId={viewerId}
async fn conversations(
    state: web::Data<AppState>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &query.viewer_id).await?;
    let summaries = state.match_threads.conversations_for(&viewer.id).await?;

    Ok(HttpResponse::Ok().json(summaries))
}

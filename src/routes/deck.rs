use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::load_viewer;
use crate::error::CoreError;
use crate::models::{DecideRequest, DecisionResponse, DeckResponse, ViewerQuery, ViewerRequest};
use crate::routes::{invalid_request, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/deck/current", web::get().to(current_candidate))
        .route("/deck/decide", web::post().to(decide))
        .route("/deck/refresh", web::post().to(refresh));
}

/// Current deck candidate
///
/// GET /api/v1/deck/current?viewerId={viewerId}
async fn current_candidate(
    state: web::Data<AppState>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &query.viewer_id).await?;
    let deck = state.decks.open(&viewer).await?;
    let deck = deck.lock().await;

    Ok(HttpResponse::Ok().json(DeckResponse {
        candidate: deck.current().ok().cloned(),
        remaining: deck.remaining(),
        exhausted: deck.is_exhausted(),
    }))
}

/// Decide on the current candidate
///
/// POST /api/v1/deck/decide
///
/// Request body:
/// ```json
/// {
///   "viewerId": "string",
///   "direction": "like|pass"
/// }
/// ```
async fn decide(
    state: web::Data<AppState>,
    req: web::Json<DecideRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let (outcome, deck) = state.decks.decide(&viewer, req.direction).await?;
    let deck = deck.lock().await;

    tracing::info!(
        "Viewer {} {:?} {} (match: {})",
        viewer.id,
        outcome.direction,
        outcome.candidate.profile.id,
        outcome.created_match.is_some()
    );

    Ok(HttpResponse::Ok().json(DecisionResponse {
        candidate_id: outcome.candidate.profile.id,
        direction: outcome.direction,
        created_match: outcome.created_match,
        next: deck.current().ok().cloned(),
        remaining: deck.remaining(),
    }))
}

/// Rebuild the viewer's deck
///
/// POST /api/v1/deck/refresh
async fn refresh(
    state: web::Data<AppState>,
    req: web::Json<ViewerRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let deck = state.decks.refresh(&viewer).await?;
    let deck = deck.lock().await;

    Ok(HttpResponse::Ok().json(DeckResponse {
        candidate: deck.current().ok().cloned(),
        remaining: deck.remaining(),
        exhausted: deck.is_exhausted(),
    }))
}

use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::load_viewer;
use crate::error::CoreError;
use crate::models::{
    DirectThreadResponse, MarkReadResponse, Match, ProjectThreadQuery, SendMessageRequest, ThreadResponse,
    ViewerQuery, ViewerRequest,
};
use crate::routes::{invalid_request, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches/{match_id}/messages", web::get().to(match_thread))
        .route("/matches/{match_id}/messages", web::post().to(send_match_message))
        .route("/matches/{match_id}/messages/read", web::post().to(mark_match_thread_read))
        .route("/projects/{project_id}/messages", web::get().to(project_thread))
        .route("/projects/{project_id}/messages", web::post().to(send_project_message))
        .route("/projects/{project_id}/messages/read", web::post().to(mark_project_thread_read));
}

/// Match the viewer takes part in, or 404
async fn viewer_match(state: &AppState, match_id: &str, viewer_id: &str) -> Result<Match, CoreError> {
    match state.ledger.get(match_id).await? {
        Some(record) if record.involves(viewer_id) => Ok(record),
        _ => Err(CoreError::UnknownMatch(match_id.to_string())),
    }
}

/// GET /api/v1/matches/{matchId}/messages?viewerId={viewerId}
async fn match_thread(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ViewerQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &query.viewer_id).await?;
    let record = viewer_match(&state, &path, &viewer.id).await?;

    let messages = state.match_threads.thread_messages(&record.id).await?;
    let unread = messages
        .iter()
        .filter(|m| m.receiver_id == viewer.id && !m.read)
        .count();

    Ok(HttpResponse::Ok().json(ThreadResponse { messages, unread }))
}

/// Send a message into a match thread
///
/// POST /api/v1/matches/{matchId}/messages
///
/// Request body:
/// ```json
/// {
///   "viewerId": "string",
///   "receiverId": "string",
///   "content": "string"
/// }
/// ```
async fn send_match_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let sent = state
        .match_threads
        .send_message(&path, &viewer.id, &req.receiver_id, &req.content)
        .await?;

    Ok(HttpResponse::Created().json(sent))
}

/// POST /api/v1/matches/{matchId}/messages/read
async fn mark_match_thread_read(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<ViewerRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let record = viewer_match(&state, &path, &viewer.id).await?;
    let marked = state.match_threads.mark_thread_read(&record.id, &viewer.id).await?;

    Ok(HttpResponse::Ok().json(MarkReadResponse { marked }))
}

/// GET /api/v1/projects/{projectId}/messages?viewerId={viewerId}&peerId={peerId}
async fn project_thread(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ProjectThreadQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &query.viewer_id).await?;
    let messages = state
        .project_threads
        .thread_messages(&path, &viewer.id, &query.peer_id)
        .await?;
    let unread = messages
        .iter()
        .filter(|m| m.receiver_id == viewer.id && !m.read)
        .count();

    Ok(HttpResponse::Ok().json(DirectThreadResponse { messages, unread }))
}

/// Send a direct message about a project
///
/// POST /api/v1/projects/{projectId}/messages
async fn send_project_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let receiver = state
        .directory
        .get_profile(&req.receiver_id)
        .await?
        .ok_or_else(|| CoreError::InvalidThreadKey(format!("unknown receiver {}", req.receiver_id)))?;

    let sent = state
        .project_threads
        .send_message(&path, &viewer, &receiver, &req.content)
        .await?;

    Ok(HttpResponse::Created().json(sent))
}

/// POST /api/v1/projects/{projectId}/messages/read
async fn mark_project_thread_read(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<ProjectThreadQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(invalid_request(errors));
    }

    let viewer = load_viewer(state.directory.as_ref(), &req.viewer_id).await?;
    let marked = state
        .project_threads
        .mark_thread_read(&path, &viewer.id, &req.peer_id)
        .await?;

    Ok(HttpResponse::Ok().json(MarkReadResponse { marked }))
}

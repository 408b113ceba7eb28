// Route exports
pub mod deck;
pub mod matches;
pub mod messages;

use actix_web::{error, http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use std::sync::Arc;
use validator::ValidationErrors;

use crate::core::{Conversations, MatchLedger, MatchThreads, ProjectThreads, MAX_MESSAGE_CHARS};
use crate::error::{CoreError, ErrorKind};
use crate::models::{DirectMessage, ErrorResponse, Message};
use crate::services::{DeckSessions, MatchStore, MessageStore, ProfileDirectory, ProjectDirectory};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn ProfileDirectory>,
    pub ledger: MatchLedger,
    pub match_threads: MatchThreads,
    pub project_threads: ProjectThreads,
    pub decks: Arc<DeckSessions>,
}

impl AppState {
    /// Wire the core services over a set of stores
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        projects: Arc<dyn ProjectDirectory>,
        matches: Arc<dyn MatchStore>,
        messages: Arc<dyn MessageStore<Message>>,
        direct_messages: Arc<dyn MessageStore<DirectMessage>>,
        options: StateOptions,
    ) -> Self {
        let ledger = MatchLedger::new(matches);
        let match_threads = MatchThreads::new(
            ledger.clone(),
            Conversations::with_max_chars(messages, options.max_message_chars),
        );
        let project_threads = ProjectThreads::new(
            projects,
            Conversations::with_max_chars(direct_messages, options.max_message_chars),
        );
        let decks = Arc::new(DeckSessions::new(
            directory.clone(),
            ledger.clone(),
            options.max_sessions,
            options.session_ttl_secs,
        ));

        Self {
            directory,
            ledger,
            match_threads,
            project_threads,
            decks,
        }
    }
}

/// Tunables for [`AppState::new`]
#[derive(Debug, Clone, Copy)]
pub struct StateOptions {
    pub max_message_chars: usize,
    pub max_sessions: u64,
    pub session_ttl_secs: u64,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            max_message_chars: MAX_MESSAGE_CHARS,
            max_sessions: 10_000,
            session_ttl_secs: 1800,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(deck::configure)
            .configure(messages::configure),
    );
}

impl ResponseError for CoreError {
    fn status_code(&self) -> StatusCode {
        match (self, self.kind()) {
            (CoreError::NoCurrentViewer, _) => StatusCode::FORBIDDEN,
            (CoreError::UnknownMatch(_), _) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Precondition) => StatusCode::CONFLICT,
            (_, ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Persistence) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code(self).to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

fn error_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::NoCurrentViewer => "no_current_viewer",
        CoreError::DeckNotLoaded => "deck_not_loaded",
        CoreError::DeckExhausted => "deck_exhausted",
        CoreError::DecisionInFlight(_) => "decision_in_flight",
        CoreError::InvalidThreadKey(_) => "invalid_thread_key",
        CoreError::InvalidPair(_) => "invalid_pair",
        CoreError::UnknownMatch(_) => "unknown_match",
        CoreError::EmptyMessage => "empty_message",
        CoreError::MessageTooLong { .. } => "message_too_long",
        CoreError::Persistence(_) => "storage_error",
    }
}

/// 400 response for a request that failed DTO validation
pub(crate) fn invalid_request(errors: ValidationErrors) -> HttpResponse {
    tracing::info!("Validation failed: field_errors={:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Malformed request payload, rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct PayloadError(ErrorResponse);

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().json(&self.0)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    PayloadError(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    })
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    PayloadError(ErrorResponse {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, Project, Role};
    use crate::services::{MemoryStore, StoreError};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn profile(id: &str, role: Role, genres: &[&str]) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            role,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            location: String::new(),
            bio: String::new(),
            verified: false,
            rating: 0.0,
            highlight_count: 0,
            onboarded: true,
        }
    }

    async fn seeded_state() -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::with_profiles(vec![
            profile("viewer", Role::Producer, &["house"]),
            profile("singer", Role::Vocalist, &["house"]),
            profile("drummer", Role::Instrumentalist, &[]),
        ]));
        store
            .add_project(Project {
                id: "p1".to_string(),
                title: "Summer EP".to_string(),
                owner_id: "viewer".to_string(),
            })
            .await;

        let state = AppState::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            StateOptions::default(),
        );
        (store, state)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                    .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health() {
        let (_, state) = seeded_state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn test_deck_like_creates_match_and_thread() {
        let (_, state) = seeded_state().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/v1/deck/current?viewerId=viewer")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["candidate"]["profile"]["id"], "singer");
        assert_eq!(body["remaining"], 2);

        let req = test::TestRequest::post()
            .uri("/api/v1/deck/decide")
            .set_json(json!({"viewerId": "viewer", "direction": "like"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["candidateId"], "singer");
        assert_eq!(body["next"]["profile"]["id"], "drummer");
        let match_id = body["createdMatch"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/matches/{}/messages", match_id))
            .set_json(json!({"viewerId": "viewer", "receiverId": "singer", "content": "hey"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/matches/{}/messages?viewerId=singer", match_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["unread"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/conversations?viewerId=singer")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["partnerId"], "viewer");
        assert_eq!(body[0]["unread"], 1);
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let (_, state) = seeded_state().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/v1/deck/current?viewerId=ghost")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get().uri("/api/v1/deck/current").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/v1/matches/missing/messages?viewerId=viewer")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/v1/projects/p1/messages")
            .set_json(json!({"viewerId": "viewer", "receiverId": "singer", "content": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "empty_message");
    }

    #[actix_web::test]
    async fn test_project_thread_round() {
        let (_, state) = seeded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/projects/p1/messages")
            .set_json(json!({"viewerId": "viewer", "receiverId": "singer", "content": "join my EP?"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["senderName"], "VIEWER");

        let req = test::TestRequest::post()
            .uri("/api/v1/projects/p1/messages/read")
            .set_json(json!({"viewerId": "singer", "peerId": "viewer"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["marked"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/projects/p1/messages?viewerId=singer&peerId=viewer")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["unread"], 0);
        assert_eq!(body["messages"][0]["read"], true);
    }

    #[::core::prelude::v1::test]
    fn test_status_mapping() {
        assert_eq!(CoreError::NoCurrentViewer.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CoreError::DeckExhausted.status_code(), StatusCode::CONFLICT);
        assert_eq!(CoreError::EmptyMessage.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(CoreError::UnknownMatch("m".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            CoreError::Persistence(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

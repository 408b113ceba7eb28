use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use riffmatch::config::{Settings, StorageBackend};
use riffmatch::models::{DirectMessage, Message};
use riffmatch::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState, StateOptions};
use riffmatch::services::{
    AppwriteClient, AppwriteCollections, MatchStore, MemoryStore, MessageStore, PostgresStore, ProfileDirectory,
    ProjectDirectory,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

type Stores = (
    Arc<dyn MatchStore>,
    Arc<dyn MessageStore<Message>>,
    Arc<dyn MessageStore<DirectMessage>>,
);

/// One backend serving matches and both message kinds
fn shared_stores<S>(store: Arc<S>) -> Stores
where
    S: MatchStore + MessageStore<Message> + MessageStore<DirectMessage> + 'static,
{
    let matches: Arc<dyn MatchStore> = store.clone();
    let messages: Arc<dyn MessageStore<Message>> = store.clone();
    let direct_messages: Arc<dyn MessageStore<DirectMessage>> = store;
    (matches, messages, direct_messages)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting Riffmatch service...");

    // Profile and project directory
    let (directory, projects): (Arc<dyn ProfileDirectory>, Arc<dyn ProjectDirectory>) = match &settings.appwrite {
        Some(appwrite) => {
            let collections = AppwriteCollections {
                profiles: settings.collection.profiles.clone(),
                projects: settings.collection.projects.clone(),
            };
            let client = AppwriteClient::new(
                appwrite.endpoint.clone(),
                appwrite.api_key.clone(),
                appwrite.project_id.clone(),
                appwrite.database_id.clone(),
                collections,
                appwrite.page_size.unwrap_or(100),
            )
            .map_err(|e| {
                error!("Failed to build Appwrite client: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;

            info!("Appwrite directory initialized");
            let client = Arc::new(client);
            let directory: Arc<dyn ProfileDirectory> = client.clone();
            let projects: Arc<dyn ProjectDirectory> = client;
            (directory, projects)
        }
        None => {
            warn!("No Appwrite settings, serving profiles from an empty in-memory directory");
            let memory = Arc::new(MemoryStore::new());
            let directory: Arc<dyn ProfileDirectory> = memory.clone();
            let projects: Arc<dyn ProjectDirectory> = memory;
            (directory, projects)
        }
    };

    // Match and message storage
    let (matches, messages, direct_messages) = match settings.storage.backend {
        StorageBackend::Postgres => {
            let Some(db) = settings.database.as_ref() else {
                error!("Storage backend is postgres but no database url is configured");
                std::process::exit(1);
            };

            let store = PostgresStore::from_settings(
                &db.url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;

            info!("PostgreSQL store initialized");
            shared_stores(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; matches and messages are lost on restart");
            shared_stores(Arc::new(MemoryStore::new()))
        }
    };

    let options = StateOptions {
        max_message_chars: settings.messaging.max_message_chars,
        max_sessions: settings.deck.max_sessions,
        session_ttl_secs: settings.deck.session_ttl_secs,
    };
    let app_state = AppState::new(directory, projects, matches, messages, direct_messages, options);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

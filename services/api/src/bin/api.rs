//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{content::FsContentCatalog, db::DbAdapter, reply_llm::OpenAiReplyAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        chat::{open_chat_handler, send_chat_handler},
        middleware::require_auth,
        quiz::{advance_handler, answer_handler, get_quiz_handler, retry_handler, start_quiz_handler},
        rest::{
            get_biography_handler, get_character_handler, list_characters_handler,
            reset_progress_handler, ApiDoc,
        },
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use mythquest_core::chat::ChatSessionManager;
use mythquest_core::ports::{ContentCatalog, ReplyGenerator, StateStore};
use mythquest_core::progress::ProgressStore;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Configuration and logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded");

    // --- 2. Database pool and migrations ---
    info!("Connecting to Postgres");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Applying database migrations");
    db_adapter.run_migrations().await?;

    // --- 3. Content catalog and reply generation ---
    let catalog: Arc<dyn ContentCatalog> =
        Arc::new(FsContentCatalog::load(&config.content_dir).await?);
    info!(
        "Loaded {} characters from {}",
        catalog.roster().len(),
        config.content_dir.display()
    );

    let openai_config = match config.openai_api_key.as_ref() {
        Some(key) => OpenAIConfig::new().with_api_key(key),
        None => {
            warn!("OPENAI_API_KEY is not set; character replies will use the fallback line");
            OpenAIConfig::new()
        }
    };
    let openai_client = Client::with_config(openai_config);
    let reply_adapter: Arc<dyn ReplyGenerator> = Arc::new(OpenAiReplyAdapter::new(
        openai_client,
        config.chat_model.clone(),
        catalog.clone(),
    ));

    let state_store: Arc<dyn StateStore> = db_adapter.clone();
    let progress = ProgressStore::new(state_store.clone());
    let chat = ChatSessionManager::new(state_store, reply_adapter, catalog.clone());

    // --- 4. Shared application state ---
    let app_state = Arc::new(AppState {
        identity: db_adapter,
        catalog,
        progress,
        chat,
        quiz_attempts: Mutex::new(HashMap::new()),
        config: config.clone(),
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {e}",
            config.allowed_origin
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Routers ---
    // No session needed for these.
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Everything else sits behind the session cookie.
    let protected_routes = Router::new()
        .route("/characters", get(list_characters_handler))
        .route("/characters/{character_id}", get(get_character_handler))
        .route(
            "/characters/{character_id}/biography",
            get(get_biography_handler),
        )
        .route(
            "/characters/{character_id}/quiz",
            post(start_quiz_handler).get(get_quiz_handler),
        )
        .route("/characters/{character_id}/quiz/answer", post(answer_handler))
        .route(
            "/characters/{character_id}/quiz/advance",
            post(advance_handler),
        )
        .route("/characters/{character_id}/quiz/retry", post(retry_handler))
        .route(
            "/characters/{character_id}/chat",
            get(open_chat_handler).post(send_chat_handler),
        )
        .route("/progress/reset", post(reset_progress_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Swagger rides alongside the API routes.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Serve ---
    info!("Listening on {}", config.bind_address);
    info!("Swagger UI at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

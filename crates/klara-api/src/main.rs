use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use klara_api::{
    config::Config,
    middleware::logging,
    routes::{chat, conversations, health},
    state::AppState,
};
use klara_audit::{AuditSink, NoopAuditSink, PostgresAuditSink};
use klara_cache::{CacheStore, MemoryCache, RedisCache};
use klara_chat::{ChatOptions, ChatService};
use klara_persist::{ConversationStore, MongoConversationStore};
use klara_upstream::{ChatBackend, HttpChatBackend, UpstreamConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Klara chat backend");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize persistence (MongoDB)
    tracing::info!("Connecting to MongoDB");
    let mongo = MongoConversationStore::connect(&config.mongodb_uri, &config.mongodb.database)
        .await?;
    let store: Arc<dyn ConversationStore> = Arc::new(mongo);
    tracing::info!("MongoDB connected");

    // Initialize the cache backend
    let cache: Arc<dyn CacheStore> = match config.cache.backend.as_str() {
        "redis" => {
            tracing::info!("Connecting to Redis");
            Arc::new(RedisCache::connect(&config.cache.redis_url).await?)
        }
        _ => {
            tracing::info!("Using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    // Initialize the upstream chat adapter
    tracing::info!("Initializing upstream chat client");
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::new(UpstreamConfig {
        base_url: config.upstream.base_url.clone(),
        token: config.upstream_token.clone(),
        max_context_chunks: config.upstream.max_context_chunks,
        health_interval: Duration::from_secs(config.upstream.health_interval_secs),
        health_timeout: Duration::from_secs(config.upstream.health_timeout_secs),
        call_timeout: Duration::from_secs(config.upstream.call_timeout_secs),
    })?);

    // Initialize the audit sink
    let audit: Arc<dyn AuditSink> = if config.audit.enabled {
        tracing::info!("Connecting to audit database");
        Arc::new(
            PostgresAuditSink::connect(
                &config.audit_database_url,
                &config.audit.environment,
                config.audit.auto_create_table,
            )
            .await?,
        )
    } else {
        tracing::info!("Audit logging disabled");
        Arc::new(NoopAuditSink)
    };

    // Assemble the chat service
    let chat_service = ChatService::new(
        Arc::clone(&store),
        cache,
        backend,
        audit,
        ChatOptions {
            history_limit: config.chat.history_limit,
            follow_up_probability: config.chat.follow_up_probability,
            ..ChatOptions::default()
        },
    );

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), chat_service, store));

    // Build router
    let app = build_router(state.clone());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/chat/query", post(chat::chat_query))
        .route("/conversations", get(conversations::list_conversations))
        .route(
            "/conversations/:conversation_id/messages",
            get(conversations::list_messages),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

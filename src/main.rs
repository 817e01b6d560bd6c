use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billscan::handlers::{health_handler, ready_handler, test_remote_handler, upload_handler};
use billscan::services::GeminiClient;
use billscan::{AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billscan=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Billscan Extraction Service");
    tracing::info!("Max file size: {}MB", config.max_file_size_mb);
    tracing::info!("Max concurrent requests: {}", config.max_concurrent_requests);
    tracing::info!("Extraction endpoint: {}", config.gemini_url);

    let remote = GeminiClient::new(&config)?;
    let max_body_bytes = config.max_file_size_mb * 1024 * 1024;
    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    let state = Arc::new(AppState { config, remote });

    // Build our application with routes
    let app = Router::new()
        // Health endpoints
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/test-remote", get(test_remote_handler))
        // Bill extraction endpoint
        .route("/upload", post(upload_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state);

    // Determine port from environment (Railway compatibility)
    let port = env::var("PORT")
        .unwrap_or_else(|_| server_port.to_string())
        .parse::<u16>()
        .unwrap_or(server_port);

    let addr = format!("{}:{}", server_host, port);

    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

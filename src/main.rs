//! siwegate application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build shared state (verification engine + session cookie codec)
//! 3. Build router with session, security-header, CORS, and panic layers
//! 4. Start Axum server

use axum::http::{header, HeaderValue, Method, Response, StatusCode};
use siwegate::{
    config::Config,
    middleware::security_headers,
    routes,
    session::layer::{session_middleware, AppState},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Last-resort boundary: a panicking handler still answers with the
/// standard "Unknown error" body instead of a dropped connection.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<axum::body::Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unhandled panic".to_string()
    };
    tracing::error!(error = %detail, "Handler panicked");

    let body = serde_json::json!({ "message": format!("Unknown error: {detail}") }).to_string();
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .expect("static response parts are valid")
}

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting siwegate on {}", config.bind_addr);
    if config.dev_mode {
        tracing::warn!("Development mode is on; do not expose this instance publicly");
    }

    // Credentialed CORS: the session cookie has to survive requests from
    // the configured front-end origins. Wildcards are not allowed here.
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|origin| origin.parse().expect("Invalid origin in ALLOWED_ORIGINS"))
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let state = AppState::new(config.clone());

    let app = routes::api_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(axum::middleware::from_fn(security_headers))
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

//! HTTP host for the resolved settings: allowed hosts, CORS and static assets.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{
    enabled_providers, mount_path, CorsConfig, DatabaseConnection, Settings, StaticAssetStrategy,
};
use crate::security::{allowed_hosts_middleware, effective_allowed_hosts};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let settings = &state.settings;
    let database = match &settings.database {
        Some(DatabaseConnection::Sqlite { .. }) => "sqlite".to_string(),
        Some(DatabaseConnection::Remote(remote)) => remote.engine.to_string(),
        None => "unconfigured".to_string(),
    };

    let environment = if settings.development_mode {
        "development"
    } else {
        "production"
    };
    let social_providers: Vec<String> = enabled_providers(&settings.social)
        .iter()
        .map(|p| p.to_string())
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "service": settings.site.name,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": environment,
        "debug": settings.debug,
        "database": database,
        "social_providers": social_providers,
        "timestamp": chrono::Utc::now(),
    }))
}

pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrftoken"),
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(cors.allow_credentials)
}

fn mount_static(app: Router<AppState>, strategy: &StaticAssetStrategy) -> Router<AppState> {
    match strategy {
        StaticAssetStrategy::LocalFilesystem {
            static_root,
            static_url,
            media_root,
            media_url,
        } => app
            .nest_service(&mount_path(static_url), ServeDir::new(static_root))
            .nest_service(&mount_path(media_url), ServeDir::new(media_root)),
        StaticAssetStrategy::CompressedManifest {
            static_root,
            static_url,
        } => app.nest_service(
            &mount_path(static_url),
            ServeDir::new(static_root)
                .precompressed_gzip()
                .precompressed_br(),
        ),
    }
}

pub fn router(settings: Arc<Settings>) -> Router {
    let allowed_hosts = Arc::new(effective_allowed_hosts(&settings));

    let mut app = mount_static(
        Router::new().route("/health", get(health_check)),
        &settings.static_assets,
    );
    if settings.static_assets.is_manifest() {
        app = app.layer(CompressionLayer::new());
    }

    app.layer(cors_layer(&settings.cors))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            allowed_hosts,
            allowed_hosts_middleware,
        ))
        .with_state(AppState { settings })
}

pub async fn serve(settings: Arc<Settings>) -> Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(
        "Static assets under {} from {}",
        settings.static_assets.static_url(),
        settings.static_assets.static_root().display()
    );
    let app = router(settings);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

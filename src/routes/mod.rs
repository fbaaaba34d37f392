pub mod posts;
pub mod spa;
pub mod users;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::UPLOADS_ROUTE;

/// The JSON API, mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/posts", posts::router())
        .nest("/users", users::router())
        .fallback(|| async { AppError::NotFound("Not found".into()) })
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;

    let mut app = Router::new()
        .nest("/api", api_router())
        .nest_service(UPLOADS_ROUTE, ServeDir::new(state.config.uploads_path()));

    if let Some(ref dir) = state.config.server.static_dir {
        tracing::info!("Serving client from {}", dir.display());
        app = app.fallback_service(spa::service(dir));
    }

    Ok(app
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = if config.server.production {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::exact(HeaderValue::from_str(&config.server.frontend_origin)?)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::SET_COOKIE]))
}

//! Triage API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`,
//! wrapped in a CORS layer for the configured front-end origins.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the triage API router.
pub fn triage_api_router(ctx: ApiContext, allowed_origins: &[String]) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/triage", post(endpoints::triage::assess))
        .route("/demo", get(endpoints::demo::list))
        .route("/demo/:id", get(endpoints::demo::payload))
        .route("/rules", get(endpoints::rules::list))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value != "*" => Some(value),
            _ => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

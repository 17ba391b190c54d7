pub mod auth;
mod categories;
pub mod error;
pub mod metrics;
mod products;
mod stats;
pub mod validation;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Session routes (public; /user resolves the session itself)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/user", get(auth::current_user));

    // Storefront reads (public)
    let catalog_routes = Router::new()
        .route("/categories", get(categories::list_categories))
        .route("/categories/:slug", get(categories::get_category))
        .route("/products", get(products::list_products))
        .route("/products/:key", get(products::get_product));

    // Admin routes
    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route("/products/:id", put(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        .route("/categories", post(categories::create_category))
        .route("/categories/:id", delete(categories::delete_category))
        .route("/stats", get(stats::get_stats))
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Unknown /api paths get a JSON 404 instead of the SPA's index.html
    let api_routes = auth_routes
        .merge(catalog_routes)
        .nest("/admin", admin_routes)
        .fallback(api_not_found);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(CompressionLayer::new());

    if let Some(cors) = cors_layer(&state.config.server.cors_origins) {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Credentialed CORS for the configured origins, or none for same-origin only
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

async fn api_not_found() -> error::ApiError {
    error::ApiError::not_found("API endpoint not found")
}

async fn health_check() -> &'static str {
    "OK"
}

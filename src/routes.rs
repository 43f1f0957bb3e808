use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    error::HttpError,
    handler::{
        auth::auth_handler, google_oauth::oauth_handler, parcels::parcels_handler,
        users::users_handler,
    },
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Parcel delivery API is running"
    }))
}

async fn not_found() -> impl IntoResponse {
    HttpError::new("API Not Found", StatusCode::NOT_FOUND)
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler().merge(oauth_handler()))
        .nest("/user", users_handler())
        .nest("/parcels", parcels_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_route)
        .fallback(not_found)
}

pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::FinalizerConfig;
use crate::services::finalizer::FinalizerService;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::hooks::upload_complete,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::hooks::UploadCompleteRequest,
            api::handlers::hooks::UploadCompleteResponse,
            api::handlers::health::HealthResponse,
            models::UploadMetadata,
        )
    ),
    tags(
        (name = "hooks", description = "Upload-protocol completion callbacks"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub finalizer: Arc<FinalizerService>,
    pub config: FinalizerConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/hooks/upload-complete",
            post(api::handlers::hooks::upload_complete),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

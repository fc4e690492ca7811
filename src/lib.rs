pub mod auth;
pub mod config;
pub mod fetcher;
pub mod handlers;
pub mod logs;
pub mod models;
pub mod resolver;
pub mod state;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GMB Website Finder API",
        description = "Resolves a business's own website from its Google Maps listing."
    ),
    paths(
        handlers::system::alive,
        handlers::system::health,
        handlers::system::readiness,
        handlers::maps::process_maps,
    ),
    components(schemas(
        models::MapRecord,
        models::ResolutionOutcome,
        models::ResolutionStatus,
        models::ResolutionSource,
        models::UnresolvedReason,
        models::ProcessMapsRequest,
        models::ProcessMapsResponse,
        models::AliveResponse,
        models::HealthResponse,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "resolve", description = "Map link to website resolution"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/process-maps", post(handlers::process_maps))
        .route(
            "/api/logs/backend",
            get(logs::backend_logs).delete(logs::clear_backend_logs),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health
        .route("/", get(handlers::alive))
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

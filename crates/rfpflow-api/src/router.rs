//! Route table

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post, put},
};
use rfpflow_config::ServerConfig;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{admin, health, proposals, rfps, scopes, stages};
use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // RFPs and documents
        .route("/rfps", get(rfps::list_rfps).post(rfps::create_rfp))
        .route("/rfps/:id", get(rfps::get_rfp))
        .route("/rfps/:id/upload", post(rfps::upload_file))
        .route(
            "/rfps/:id/files",
            get(rfps::list_files).post(rfps::upload_file),
        )
        .route("/rfps/:id/analyze", post(stages::analyze))
        .route("/rfps/:id/vendors-matching", get(stages::match_vendors))
        .route(
            "/rfps/:id/save-vendor-analysis",
            post(rfps::save_vendor_analysis),
        )
        .route(
            "/rfps/:id/set-fabricante-escolhido",
            post(rfps::set_chosen_vendor),
        )
        .route("/vendors", get(rfps::list_vendors))
        // Bill of materials
        .route("/bom/rfp/:id/generate", post(stages::generate_bom))
        .route("/bom/rfp/:id", get(stages::get_bom))
        // Service scope
        .route("/escopos/rfp/:id/sugerir", post(stages::suggest_scope))
        .route(
            "/escopos/rfp/:id",
            get(scopes::list_scopes).post(scopes::create_scope),
        )
        .route(
            "/escopos/:id",
            put(scopes::update_scope).delete(scopes::delete_scope),
        )
        // Technical proposals
        .route(
            "/propostas_tecnicas/rfp/:id/gerar",
            post(stages::generate_proposal),
        )
        .route(
            "/propostas_tecnicas/rfp/:id/download",
            get(proposals::download),
        )
        .route(
            "/propostas/item/:id",
            get(proposals::get_proposal).put(proposals::save_proposal),
        )
        .route("/propostas/rfp/:id", get(proposals::list_for_rfp))
        .nest("/admin/config", admin_router())
        .layer(DefaultBodyLimit::max(crate::MAX_BODY_BYTES))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/providers",
            get(admin::list_providers).post(admin::create_provider),
        )
        .route("/providers/selected", get(admin::selected_provider))
        .route("/providers/:id", put(admin::update_provider))
        .route("/providers/:id/select", patch(admin::select_provider))
        .route(
            "/prompts",
            get(admin::list_prompts).post(admin::create_prompt),
        )
        .route("/prompts/by_name/:name", get(admin::prompt_by_name))
        .route(
            "/prompts/:id",
            get(admin::get_prompt)
                .put(admin::update_prompt)
                .delete(admin::delete_prompt),
        )
}

/// CORS policy from the configured origins; `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, attempt},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges the assessment, attempt and admin sub-routers.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("static origin"),
            "http://127.0.0.1:3000".parse().expect("static origin"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let attempt_routes = Router::new()
        .route("/start", post(attempt::start_attempt))
        .route("/violation", post(attempt::report_violation))
        .route("/submit", post(attempt::submit_attempt));

    let assessment_routes = Router::new()
        .route("/{id}", get(assessment::get_assessment))
        // Protected attempt routes
        .merge(
            Router::new()
                .nest("/{id}/attempts", attempt_routes)
                .route("/{id}/result", get(attempt::get_result))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/assessments", post(assessment::create_assessment))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/assessments", assessment_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, quiz, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quizzes, sessions, admin).
/// * Only the leaderboard is public; everything else requires a Bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let quiz_routes = Router::new()
        .route("/{quiz_id}/leaderboard", get(quiz::get_leaderboard))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/{quiz_id}/sessions", post(quiz::start_session))
                .route("/{quiz_id}/sessions/can-start", get(quiz::can_start))
                .route("/{quiz_id}/rank", get(quiz::get_user_rank))
                .layer(auth.clone()),
        );

    let session_routes = Router::new()
        .route("/", get(session::list_sessions))
        .route("/{id}", get(session::get_session))
        .route("/{id}/pause", post(session::pause_session))
        .route("/{id}/resume", post(session::resume_session))
        .route("/{id}/abandon", post(session::abandon_session))
        .route("/{id}/submit", post(session::submit_quiz))
        .route("/{id}/questions/current", get(session::current_question))
        .route("/{id}/questions/next", post(session::next_question))
        .route("/{id}/questions/previous", post(session::previous_question))
        .route("/{id}/questions/{index}", get(session::question_by_index))
        .route("/{id}/answers", post(session::submit_answer))
        .route("/{id}/result", get(session::get_result))
        .layer(auth.clone());

    let admin_routes = Router::new()
        .route(
            "/sessions/{id}/answers/{question_id}/review",
            post(admin::review_answer),
        )
        .route("/sessions/sweep", post(admin::sweep_expired))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth);

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

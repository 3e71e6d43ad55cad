// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::AppError,
    handlers::{auth, chat, friend_requests, users},
    state::AppState,
    utils::jwt::auth_middleware,
};

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "the requested method is not supported for this resource" })),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Assembles the main application router.
///
/// * Everything lives under `/api/v1`.
/// * `/users` and `/chat` require a session; under `/auth` only `onboarding` and `me` do.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let require_session = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/onboarding", post(auth::onboarding))
        .route("/me", get(auth::me))
        .route_layer(require_session.clone())
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout));

    let friend_request_routes = Router::new()
        .route("/create/{recipient_id}", post(friend_requests::create))
        .route("/accept/{friend_request_id}", post(friend_requests::accept))
        .route("/from", get(friend_requests::incoming))
        .route("/send", get(friend_requests::outgoing));

    let user_routes = Router::new()
        .route("/recommended", get(users::recommended))
        .route("/friends-with-me", get(users::my_friends))
        .nest("/friends-request", friend_request_routes)
        .route_layer(require_session.clone());

    let chat_routes = Router::new()
        .route("/token", get(chat::token))
        .route_layer(require_session);

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/chat", chat_routes);

    Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

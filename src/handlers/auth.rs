// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::Validate;

use crate::{
    chat::{ChatProvider, ChatUser},
    config::Config,
    error::AppError,
    models::user::{NewUser, OnboardingRequest, SigninRequest, SignupRequest, User, random_avatar},
    state::AppState,
    store::{Store, StoreError},
    utils::{
        hash::{hash_password, verify_password},
        html::clean_html,
        jwt::{CurrentUser, clear_session_cookie, session_cookie, sign_jwt},
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Pushes the profile to the chat directory. A failure here is a 500,
/// even though the user write before it has already been committed.
async fn sync_chat_profile(chat: &Arc<dyn ChatProvider>, user: &User) -> Result<(), AppError> {
    chat.upsert_user(&ChatUser::from(user)).await.map_err(|e| {
        tracing::warn!(user_id = %user.id, "chat profile sync failed: {}", e);
        AppError::from(e)
    })
}

/// Signs a session for `user` and answers 201 with the user and the cookie.
fn session_response(config: &Config, user: User) -> Result<Response, AppError> {
    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;
    let cookie = session_cookie(&token, config.jwt_expiration, config.is_production())?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user })),
    )
        .into_response())
}

/// Registers a new user.
///
/// Hashes the password using Argon2, assigns a placeholder avatar, provisions
/// the chat profile and starts a session.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.fullname = payload.fullname.trim().to_string();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let user = state
        .store
        .insert_user(NewUser {
            full_name: payload.fullname,
            email: payload.email,
            password_hash,
            profile_pic: random_avatar(),
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail => {
                AppError::field("email", "user with this email already exists")
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "user signed up");

    sync_chat_profile(&state.chat, &user).await?;

    session_response(&state.config, user)
}

/// Authenticates a user and starts a session.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let user = match state.store.get_user_by_email(&payload.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::invalid_credentials()),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::invalid_credentials());
    }

    session_response(&state.config, user)
}

pub async fn signout(State(config): State<Config>) -> Result<impl IntoResponse, AppError> {
    let cookie = clear_session_cookie(config.is_production())?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "session signout success" })),
    ))
}

/// Completes (or redoes) the profile-setup step and refreshes the chat profile.
pub async fn onboarding(
    State(store): State<Arc<dyn Store>>,
    State(chat): State<Arc<dyn ChatProvider>>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let payload = payload.trimmed();
    payload.validate()?;

    user.full_name = payload.fullname;
    user.bio = clean_html(&payload.bio);
    user.native_lng = payload.native_lng;
    user.learning_lng = payload.learning_lng;
    user.location = payload.location;
    if let Some(pic) = payload.profile_pic {
        user.profile_pic = pic;
    }
    user.is_onboarded = true;

    let user = store.update_user(&user).await?;

    sync_chat_profile(&chat, &user).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// Returns the authenticated user.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({ "user": user }))
}

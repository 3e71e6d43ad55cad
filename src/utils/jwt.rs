// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::user::User, state::AppState, store::StoreError};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "jwt-auth-token.streamify";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user ID.
    pub sub: String,
    /// Issued at, Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The authenticated user, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a session token for `user_id` valid for `expiration_seconds`.
pub fn sign_jwt(user_id: Uuid, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    let now = now_secs()?;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + expiration_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry of a session token.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::invalid_token())?;

    Ok(token_data.claims)
}

/// `Set-Cookie` value delivering a session token.
pub fn session_cookie(token: &str, max_age: u64, secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie(token, &max_age.to_string(), secure)
}

/// `Set-Cookie` value that makes the browser drop the session.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie("", "0", secure)
}

fn build_cookie(value: &str, max_age: &str, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        SESSION_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Finds the session token among the request's `Cookie` headers.
pub fn read_session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Axum Middleware: Authentication.
///
/// Reads the session cookie, verifies the token and loads the user it names.
/// On success injects [`CurrentUser`] into the request extensions; any failure
/// to identify the caller is a 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = read_session_cookie(req.headers()).ok_or_else(AppError::invalid_token)?;
    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AppError::invalid_token())?;

    let user = match state.store.get_user_by_id(user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::invalid_token()),
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

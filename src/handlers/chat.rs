// src/handlers/chat.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{chat::ChatProvider, error::AppError, utils::jwt::CurrentUser};

/// Issues the token the client uses to connect to the chat service.
pub async fn token(
    State(chat): State<Arc<dyn ChatProvider>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let value = chat.create_token(&user.id.to_string())?;

    Ok(Json(json!({ "token": { "value": value } })))
}

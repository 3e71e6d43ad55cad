// src/handlers/users.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::pagination::{MyFriendsParams, RecommendedParams},
    store::Store,
    utils::jwt::CurrentUser,
};

/// Onboarded users the caller is not friends with, those without any pending
/// or accepted request first.
pub async fn recommended(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<RecommendedParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.into_page()?;

    let (users, metadata) = store.recommended(&user, &page).await?;

    Ok(Json(json!({
        "users": users,
        "metadata": metadata,
    })))
}

/// The caller's onboarded friends, optionally narrowed by name.
pub async fn my_friends(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<MyFriendsParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, search) = params.into_query()?;

    let (users, metadata) = store.my_friends(&user, &search, &page).await?;

    Ok(Json(json!({
        "users": users,
        "metadata": metadata,
    })))
}

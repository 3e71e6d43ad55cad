// src/handlers/friend_requests.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        friend_request::NewFriendRequest,
        pagination::{IncomingRequestParams, OutgoingRequestParams},
    },
    store::{Store, StoreError},
    utils::jwt::CurrentUser,
};

const REQUEST_EXISTS: &str = "friend request already exist between you and this user";

/// Sends a friend request from the caller to `recipient_id`.
///
/// Rules, in order: the id must parse and name an existing user other than
/// the caller, the two must not be friends yet, and no request may exist
/// between them in either direction.
pub async fn create(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(recipient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invalid_recipient = || AppError::BadRequest("invalid recipient id value".to_string());

    let recipient_uuid = recipient_id.parse::<Uuid>().map_err(|_| invalid_recipient())?;
    if recipient_uuid == me.id {
        return Err(AppError::BadRequest(
            "cannot send a friend request to yourself".to_string(),
        ));
    }

    let recipient = match store.get_user_by_id(recipient_uuid).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(invalid_recipient()),
        Err(e) => return Err(e.into()),
    };

    if me.is_friend_with(recipient.id) {
        return Err(AppError::BadRequest(format!(
            "already friend with user {}",
            recipient_id
        )));
    }

    if store.check_existing(me.id, recipient.id).await? {
        return Err(AppError::BadRequest(REQUEST_EXISTS.to_string()));
    }

    // A concurrent request for the same pair can still slip past the check;
    // the store's pair constraint catches it.
    let friend_request = store
        .create_request(NewFriendRequest {
            sender_id: me.id,
            recipient_id: recipient.id,
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateRequest => AppError::BadRequest(REQUEST_EXISTS.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        request_id = %friend_request.id,
        sender_id = %me.id,
        recipient_id = %recipient.id,
        "friend request created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "friend_request": friend_request })),
    ))
}

/// Accepts a pending request addressed to the caller and links both friend sets.
pub async fn accept(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let request_id = request_id
        .parse::<Uuid>()
        .map_err(|_| AppError::BadRequest("invalid friend request id value".to_string()))?;

    let friend_request = store.get_request_by_id(request_id).await?;

    if friend_request.recipient_id != me.id {
        return Err(AppError::Forbidden);
    }

    let friend_request = store
        .accept_friend_request(&friend_request)
        .await
        .map_err(|e| match e {
            StoreError::NotPending => {
                AppError::BadRequest("friend request already accepted".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(
        request_id = %friend_request.id,
        sender_id = %friend_request.sender_id,
        recipient_id = %friend_request.recipient_id,
        "friend request accepted"
    );

    Ok(Json(json!({ "friend_request": friend_request })))
}

/// Requests addressed to the caller, each with the sender's profile.
pub async fn incoming(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Query(params): Query<IncomingRequestParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;

    let (friend_requests, metadata) = store.list_incoming(me.id, &query).await?;

    Ok(Json(json!({
        "friend_requests": friend_requests,
        "metadata": metadata,
    })))
}

/// Requests the caller sent, each with the recipient's profile.
pub async fn outgoing(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Query(params): Query<OutgoingRequestParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;

    let (friend_requests, metadata) = store.list_outgoing(me.id, &query).await?;

    Ok(Json(json!({
        "friend_requests": friend_requests,
        "metadata": metadata,
    })))
}

// src/store/mod.rs

//! Storage seam.
//!
//! Handlers only see the [`Store`] trait object; the PostgreSQL engine is used
//! in deployments, the in-memory engine in tests and local development.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    friend_request::{FriendRequest, FriendRequestWithRecipient, FriendRequestWithSender, NewFriendRequest},
    metadata::Metadata,
    pagination::{PageRequest, RequestListQuery},
    user::{NewUser, RecommendedUser, User},
};

pub mod memory;
pub mod pipeline;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("a user with this email already exists")]
    DuplicateEmail,

    #[error("a friend request already exists between these users")]
    DuplicateRequest,

    #[error("friend request is no longer pending")]
    NotPending,

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Owns user records and their friend sets.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<User>;

    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Overwrites profile fields and the friend set. Last write wins.
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    /// Appends `friend_id` to `user_id`'s friend set. One direction only;
    /// a no-op when already present or when both ids are equal.
    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<()>;

    /// Onboarded users other than `current` and its friends, users without a
    /// request relationship first.
    async fn recommended(
        &self,
        current: &User,
        page: &PageRequest,
    ) -> StoreResult<(Vec<RecommendedUser>, Metadata)>;

    /// Onboarded friends of `current`, optionally filtered by name.
    async fn my_friends(
        &self,
        current: &User,
        search: &str,
        page: &PageRequest,
    ) -> StoreResult<(Vec<User>, Metadata)>;
}

/// Owns friend request records.
#[async_trait]
pub trait FriendRequestLedger: Send + Sync {
    async fn get_request_by_id(&self, id: Uuid) -> StoreResult<FriendRequest>;

    /// True when any request links `a` and `b`, whichever sent it.
    async fn check_existing(&self, a: Uuid, b: Uuid) -> StoreResult<bool>;

    /// Creates a `Pending` request. Fails with `DuplicateRequest` when the pair is taken.
    async fn create_request(&self, request: NewFriendRequest) -> StoreResult<FriendRequest>;

    /// Persists the status and bumps `updated_at`.
    async fn update_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest>;

    async fn list_incoming(
        &self,
        recipient_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithSender>, Metadata)>;

    async fn list_outgoing(
        &self,
        sender_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithRecipient>, Metadata)>;
}

#[async_trait]
pub trait Store: UserDirectory + FriendRequestLedger {
    /// Moves a request `Pending -> Accepted` and links both friend sets in a
    /// single unit of work. `NotPending` when it was already accepted.
    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest>;
}

/// Bounds a store call; an elapsed deadline becomes `StoreError::Timeout`.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

/// Drops self references and duplicates while keeping acceptance order.
pub(crate) fn clean_friend_ids(user_id: Uuid, friend_ids: &[Uuid]) -> Vec<Uuid> {
    let mut cleaned: Vec<Uuid> = Vec::with_capacity(friend_ids.len());
    for id in friend_ids {
        if *id != user_id && !cleaned.contains(id) {
            cleaned.push(*id);
        }
    }
    cleaned
}

// src/store/memory.rs

use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        friend_request::{
            FriendRequest, FriendRequestStatus, FriendRequestWithRecipient, FriendRequestWithSender,
            NewFriendRequest, pair_key,
        },
        metadata::Metadata,
        pagination::{PageRequest, RequestListQuery},
        search::{name_matches, search_tokens},
        user::{NewUser, RecommendedUser, User},
    },
    store::{FriendRequestLedger, Store, StoreError, StoreResult, UserDirectory, clean_friend_ids},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    requests: Vec<FriendRequest>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn request_mut(&mut self, id: Uuid) -> Option<&mut FriendRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    fn has_request(&self, a: Uuid, b: Uuid) -> bool {
        self.requests.iter().any(|r| r.involves(a, b))
    }

    /// Returns true when the friend set changed.
    fn append_friend(&mut self, user_id: Uuid, friend_id: Uuid) -> StoreResult<bool> {
        let user = self.user_mut(user_id).ok_or(StoreError::NotFound)?;
        if user_id == friend_id || user.is_friend_with(friend_id) {
            return Ok(false);
        }
        user.friend_ids.push(friend_id);
        user.updated_at = Utc::now();
        Ok(true)
    }

    /// Requests matching `keep`, newest first, each joined with the profile `other` picks.
    fn joined_requests(
        &self,
        query: &RequestListQuery,
        keep: impl Fn(&FriendRequest) -> bool,
        other: impl Fn(&FriendRequest) -> Uuid,
    ) -> Vec<(FriendRequest, User)> {
        let tokens = search_tokens(&query.search);
        let mut rows: Vec<(FriendRequest, User)> = self
            .requests
            .iter()
            .filter(|r| keep(r) && query.status.admits(r.status))
            .filter_map(|r| self.user(other(r)).map(|u| (r.clone(), u.clone())))
            .filter(|(_, u)| name_matches(&u.full_name, &tokens))
            .collect();
        rows.sort_by(|(a, _), (b, _)| newest_first(a, b));
        rows
    }
}

fn newest_first(a: &FriendRequest, b: &FriendRequest) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Applies the page window and builds metadata from the pre-window total.
fn paginate<T>(rows: Vec<T>, page: &PageRequest) -> (Vec<T>, Metadata) {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset().max(0) as usize)
        .take(page.limit().max(0) as usize)
        .collect();
    (items, Metadata::calculate(total, page))
}

/// In-process store with the same filtering, ordering and paging rules as
/// [`PgStore`](crate::store::PgStore). Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables.user(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            bio: String::new(),
            profile_pic: user.profile_pic,
            native_lng: String::new(),
            learning_lng: String::new(),
            location: String::new(),
            is_onboarded: false,
            friend_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let stored = tables.user_mut(user.id).ok_or(StoreError::NotFound)?;
        stored.full_name = user.full_name.clone();
        stored.bio = user.bio.clone();
        stored.profile_pic = user.profile_pic.clone();
        stored.native_lng = user.native_lng.clone();
        stored.learning_lng = user.learning_lng.clone();
        stored.location = user.location.clone();
        stored.is_onboarded = user.is_onboarded;
        stored.friend_ids = clean_friend_ids(user.id, &user.friend_ids);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.append_friend(user_id, friend_id)?;
        Ok(())
    }

    async fn recommended(
        &self,
        current: &User,
        page: &PageRequest,
    ) -> StoreResult<(Vec<RecommendedUser>, Metadata)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RecommendedUser> = tables
            .users
            .iter()
            .filter(|u| u.is_onboarded && u.id != current.id && !current.is_friend_with(u.id))
            .map(|u| RecommendedUser {
                user: u.clone(),
                has_friend_request: tables.has_request(current.id, u.id),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.has_friend_request
                .cmp(&b.has_friend_request)
                .then_with(|| a.user.created_at.cmp(&b.user.created_at))
                .then_with(|| a.user.id.cmp(&b.user.id))
        });
        Ok(paginate(rows, page))
    }

    async fn my_friends(
        &self,
        current: &User,
        search: &str,
        page: &PageRequest,
    ) -> StoreResult<(Vec<User>, Metadata)> {
        let tables = self.tables.read().await;
        let tokens = search_tokens(search);
        let mut rows: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.is_onboarded && current.is_friend_with(u.id))
            .filter(|u| name_matches(&u.full_name, &tokens))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl FriendRequestLedger for MemoryStore {
    async fn get_request_by_id(&self, id: Uuid) -> StoreResult<FriendRequest> {
        let tables = self.tables.read().await;
        tables
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn check_existing(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        Ok(self.tables.read().await.has_request(a, b))
    }

    async fn create_request(&self, request: NewFriendRequest) -> StoreResult<FriendRequest> {
        let mut tables = self.tables.write().await;
        let key = pair_key(request.sender_id, request.recipient_id);
        if tables
            .requests
            .iter()
            .any(|r| pair_key(r.sender_id, r.recipient_id) == key)
        {
            return Err(StoreError::DuplicateRequest);
        }
        let now = Utc::now();
        let created = FriendRequest {
            id: Uuid::new_v4(),
            sender_id: request.sender_id,
            recipient_id: request.recipient_id,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.requests.push(created.clone());
        Ok(created)
    }

    async fn update_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest> {
        let mut tables = self.tables.write().await;
        let stored = tables.request_mut(request.id).ok_or(StoreError::NotFound)?;
        stored.status = request.status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_incoming(
        &self,
        recipient_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithSender>, Metadata)> {
        let tables = self.tables.read().await;
        let rows = tables
            .joined_requests(query, |r| r.recipient_id == recipient_id, |r| r.sender_id)
            .into_iter()
            .map(|(request, sender)| FriendRequestWithSender { request, sender })
            .collect();
        Ok(paginate(rows, &query.page))
    }

    async fn list_outgoing(
        &self,
        sender_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithRecipient>, Metadata)> {
        let tables = self.tables.read().await;
        let rows = tables
            .joined_requests(query, |r| r.sender_id == sender_id, |r| r.recipient_id)
            .into_iter()
            .map(|(request, recipient)| FriendRequestWithRecipient { request, recipient })
            .collect();
        Ok(paginate(rows, &query.page))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest> {
        // One write guard covers the status change and both appends.
        let mut tables = self.tables.write().await;

        let (sender_id, recipient_id) = {
            let stored = tables.request_mut(request.id).ok_or(StoreError::NotFound)?;
            if stored.status != FriendRequestStatus::Pending {
                return Err(StoreError::NotPending);
            }
            (stored.sender_id, stored.recipient_id)
        };
        if tables.user(sender_id).is_none() || tables.user(recipient_id).is_none() {
            return Err(StoreError::NotFound);
        }

        tables.append_friend(recipient_id, sender_id)?;
        tables.append_friend(sender_id, recipient_id)?;

        let stored = tables.request_mut(request.id).ok_or(StoreError::NotFound)?;
        stored.status = FriendRequestStatus::Accepted;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::friend_request::StatusFilter;

    async fn onboarded(store: &MemoryStore, name: &str) -> User {
        let mut user = store
            .insert_user(NewUser {
                full_name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                password_hash: "hash".into(),
                profile_pic: String::new(),
            })
            .await
            .unwrap();
        user.is_onboarded = true;
        store.update_user(&user).await.unwrap()
    }

    fn first_page(size: i64) -> PageRequest {
        PageRequest { page: 1, page_size: size }
    }

    fn listing(search: &str) -> RequestListQuery {
        RequestListQuery {
            page: first_page(10),
            status: StatusFilter::All,
            search: search.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryStore::new();
        let user = onboarded(&store, "Alice").await;
        let fetched = store.get_user_by_id(user.id).await.unwrap();
        assert_eq!(fetched, user);
        assert!(fetched.created_at <= fetched.updated_at);
        assert!(fetched.friend_ids.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let store = MemoryStore::new();
        onboarded(&store, "Alice").await;
        let err = store
            .insert_user(NewUser {
                full_name: "Other".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                profile_pic: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn add_friend_never_links_self_or_duplicates() {
        let store = MemoryStore::new();
        let a = onboarded(&store, "Alice").await;
        let b = onboarded(&store, "Bob").await;

        store.add_friend(a.id, a.id).await.unwrap();
        store.add_friend(a.id, b.id).await.unwrap();
        store.add_friend(a.id, b.id).await.unwrap();

        let a = store.get_user_by_id(a.id).await.unwrap();
        assert_eq!(a.friend_ids, vec![b.id]);

        let mut tampered = a.clone();
        tampered.friend_ids.push(a.id);
        let saved = store.update_user(&tampered).await.unwrap();
        assert!(!saved.friend_ids.contains(&a.id));

        assert!(matches!(
            store.add_friend(Uuid::new_v4(), a.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn pair_is_unique_in_either_direction() {
        let store = MemoryStore::new();
        let a = onboarded(&store, "Alice").await;
        let b = onboarded(&store, "Bob").await;

        store
            .create_request(NewFriendRequest { sender_id: a.id, recipient_id: b.id })
            .await
            .unwrap();
        assert!(store.check_existing(a.id, b.id).await.unwrap());
        assert!(store.check_existing(b.id, a.id).await.unwrap());

        let err = store
            .create_request(NewFriendRequest { sender_id: b.id, recipient_id: a.id })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRequest));
    }

    #[tokio::test]
    async fn accept_links_both_users_once() {
        let store = MemoryStore::new();
        let a = onboarded(&store, "Alice").await;
        let b = onboarded(&store, "Bob").await;
        let request = store
            .create_request(NewFriendRequest { sender_id: a.id, recipient_id: b.id })
            .await
            .unwrap();

        let accepted = store.accept_friend_request(&request).await.unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert_eq!(store.get_user_by_id(a.id).await.unwrap().friend_ids, vec![b.id]);
        assert_eq!(store.get_user_by_id(b.id).await.unwrap().friend_ids, vec![a.id]);

        assert!(matches!(
            store.accept_friend_request(&request).await,
            Err(StoreError::NotPending)
        ));
    }

    #[tokio::test]
    async fn recommended_puts_untouched_candidates_first() {
        let store = MemoryStore::new();
        let me = onboarded(&store, "Me").await;
        let requested = onboarded(&store, "Requested").await;
        let fresh = onboarded(&store, "Fresh").await;
        let friend = onboarded(&store, "Friend").await;
        store
            .insert_user(NewUser {
                full_name: "Not Onboarded".into(),
                email: "pending@example.com".into(),
                password_hash: "hash".into(),
                profile_pic: String::new(),
            })
            .await
            .unwrap();

        store
            .create_request(NewFriendRequest { sender_id: requested.id, recipient_id: me.id })
            .await
            .unwrap();
        store.add_friend(me.id, friend.id).await.unwrap();
        store.add_friend(friend.id, me.id).await.unwrap();
        let me = store.get_user_by_id(me.id).await.unwrap();

        let (users, metadata) = store.recommended(&me, &first_page(10)).await.unwrap();
        let ids: Vec<Uuid> = users.iter().map(|r| r.user.id).collect();
        assert_eq!(ids, vec![fresh.id, requested.id]);
        assert!(!users[0].has_friend_request);
        assert!(users[1].has_friend_request);
        assert_eq!(metadata.total_records, 2);
    }

    #[tokio::test]
    async fn listings_filter_by_counterpart_name() {
        let store = MemoryStore::new();
        let me = onboarded(&store, "Me").await;
        for name in ["Alice Walker", "Bob Stone", "Alina Park"] {
            let sender = onboarded(&store, name).await;
            store
                .create_request(NewFriendRequest { sender_id: sender.id, recipient_id: me.id })
                .await
                .unwrap();
        }

        let (items, metadata) = store.list_incoming(me.id, &listing("ali")).await.unwrap();
        assert_eq!(metadata.total_records, 2);
        assert!(items.iter().all(|i| i.sender.full_name.starts_with("Ali")));

        let (items, metadata) = store.list_incoming(me.id, &listing("nobody")).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(metadata, Metadata::default());

        let (outgoing, _) = store.list_outgoing(me.id, &listing("")).await.unwrap();
        assert!(outgoing.is_empty());
    }
}

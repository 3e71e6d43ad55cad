// tests/postgres_store_tests.rs
//
// Needs a running database: DATABASE_URL=... cargo test -- --ignored

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use streamify::{
    models::{
        friend_request::{FriendRequestStatus, NewFriendRequest, StatusFilter},
        pagination::{PageRequest, RequestListQuery},
        user::{NewUser, User},
    },
    store::{FriendRequestLedger, PgStore, Store, StoreError, UserDirectory},
};

async fn store() -> PgStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    PgStore::new(pool, Duration::from_secs(3))
}

async fn onboarded(store: &PgStore, name: &str) -> User {
    let mut user = store
        .insert_user(NewUser {
            full_name: format!("{} {}", name, uuid::Uuid::new_v4()),
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            password_hash: "hash".to_string(),
            profile_pic: String::new(),
        })
        .await
        .unwrap();
    user.is_onboarded = true;
    store.update_user(&user).await.unwrap()
}

#[tokio::test]
#[ignore]
async fn insert_then_get_round_trips() {
    let store = store().await;
    let user = onboarded(&store, "Round Trip").await;

    let fetched = store.get_user_by_id(user.id).await.unwrap();
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.full_name, user.full_name);
    assert!(fetched.created_at <= fetched.updated_at);

    let by_email = store.get_user_by_email(&user.email).await.unwrap();
    assert_eq!(by_email.id, user.id);

    let duplicate = store
        .insert_user(NewUser {
            full_name: "Copy".to_string(),
            email: user.email.clone(),
            password_hash: "hash".to_string(),
            profile_pic: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(StoreError::DuplicateEmail)));
}

#[tokio::test]
#[ignore]
async fn accept_is_atomic_and_pairs_are_unique() {
    let store = store().await;
    let alice = onboarded(&store, "Alice").await;
    let bob = onboarded(&store, "Bob").await;

    let request = store
        .create_request(NewFriendRequest { sender_id: alice.id, recipient_id: bob.id })
        .await
        .unwrap();
    assert_eq!(request.status, FriendRequestStatus::Pending);

    let reverse = store
        .create_request(NewFriendRequest { sender_id: bob.id, recipient_id: alice.id })
        .await;
    assert!(matches!(reverse, Err(StoreError::DuplicateRequest)));

    let accepted = store.accept_friend_request(&request).await.unwrap();
    assert_eq!(accepted.status, FriendRequestStatus::Accepted);
    assert!(matches!(
        store.accept_friend_request(&request).await,
        Err(StoreError::NotPending)
    ));

    assert_eq!(store.get_user_by_id(alice.id).await.unwrap().friend_ids, vec![bob.id]);
    assert_eq!(store.get_user_by_id(bob.id).await.unwrap().friend_ids, vec![alice.id]);

    let query = RequestListQuery {
        page: PageRequest { page: 1, page_size: 10 },
        status: StatusFilter::Only(FriendRequestStatus::Accepted),
        search: "alice".to_string(),
    };
    let (items, metadata) = store.list_incoming(bob.id, &query).await.unwrap();
    assert_eq!(metadata.total_records, 1);
    assert_eq!(items[0].sender.id, alice.id);
}

// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use streamify::{
    chat::{ChatError, ChatProvider, ChatUser},
    config::{AppEnv, Config},
    models::user::{NewUser, User},
    routes,
    state::AppState,
    store::{MemoryStore, UserDirectory},
    utils::jwt::{SESSION_COOKIE, sign_jwt},
};

/// Chat fake that remembers every profile it was asked to sync.
#[derive(Default)]
pub struct RecordingChat {
    pub synced: Mutex<Vec<ChatUser>>,
}

impl RecordingChat {
    pub fn synced_ids(&self) -> Vec<String> {
        self.synced.lock().unwrap().iter().map(|u| u.id.clone()).collect()
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ChatError> {
        self.synced.lock().unwrap().push(user.clone());
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> Result<String, ChatError> {
        Ok(format!("chat-token-{}", user_id))
    }
}

pub struct TestApp {
    pub address: String,
    pub store: MemoryStore,
    pub chat: Arc<RecordingChat>,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        db_max_connections: 1,
        store_timeout: Duration::from_secs(3),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        app_env: AppEnv::Development,
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        stream: None,
    }
}

/// Spawns the app on a random port, backed by the in-memory store.
pub async fn spawn_app() -> TestApp {
    let store = MemoryStore::new();
    let chat = Arc::new(RecordingChat::default());
    let config = test_config();

    let state = AppState::new(Arc::new(store.clone()), chat.clone(), config.clone());
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        chat,
        config,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    /// Inserts a user straight into the store, skipping password hashing.
    pub async fn seed_user(&self, full_name: &str, onboarded: bool) -> User {
        let mut user = self
            .store
            .insert_user(NewUser {
                full_name: full_name.to_string(),
                email: format!("{}@example.com", uuid::Uuid::new_v4()),
                password_hash: "not-a-real-hash".to_string(),
                profile_pic: String::new(),
            })
            .await
            .unwrap();

        if onboarded {
            user.bio = format!("Hi, I am {}", full_name);
            user.native_lng = "English".to_string();
            user.learning_lng = "Japanese".to_string();
            user.location = "Lisbon".to_string();
            user.is_onboarded = true;
            user = self.store.update_user(&user).await.unwrap();
        }
        user
    }

    /// Client that always presents a valid session for `user`.
    pub fn client_for(&self, user: &User) -> reqwest::Client {
        let token = sign_jwt(user.id, &self.config.jwt_secret, self.config.jwt_expiration).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
        );
        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap()
    }

    pub async fn reload(&self, user: &User) -> User {
        self.store.get_user_by_id(user.id).await.unwrap()
    }
}

/// Client that keeps cookies between requests, like a browser.
pub fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().unwrap()
}

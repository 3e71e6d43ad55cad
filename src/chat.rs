// src/chat.rs

//! Bridge to the external chat service (GetStream).
//!
//! The server keeps the chat directory in sync with user profiles and hands
//! out per-user connection tokens. Nothing else about chat lives here.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::{config::StreamConfig, error::AppError, models::user::User};

const STREAM_API_URL: &str = "https://chat.stream-io-api.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat service is not configured")]
    Disabled,

    #[error("failed to sign chat token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("chat service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Profile fields mirrored into the chat directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub image: String,
}

impl From<&User> for ChatUser {
    fn from(user: &User) -> Self {
        ChatUser {
            id: user.id.to_string(),
            name: user.full_name.clone(),
            image: user.profile_pic.clone(),
        }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Creates or refreshes the user's chat profile.
    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ChatError>;

    /// Signs a non-expiring connection token for `user_id`.
    fn create_token(&self, user_id: &str) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct UserTokenClaims<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct ServerTokenClaims {
    server: bool,
}

/// GetStream chat over its REST API.
#[derive(Clone)]
pub struct StreamChat {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl StreamChat {
    pub fn new(config: &StreamConfig) -> Result<Self, ChatError> {
        Self::with_base_url(config, STREAM_API_URL)
    }

    pub fn with_base_url(config: &StreamConfig, base_url: &str) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(StreamChat {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, ChatError> {
        Ok(encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?)
    }
}

#[async_trait]
impl ChatProvider for StreamChat {
    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ChatError> {
        let server_token = self.sign(&ServerTokenClaims { server: true })?;
        let body = json!({ "users": HashMap::from([(user.id.as_str(), user)]) });

        let response = self
            .client
            .post(format!("{}/users", self.base_url))
            .query(&[("api_key", self.api_key.as_str())])
            .header("Authorization", server_token)
            .header("Stream-Auth-Type", "jwt")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(user_id = %user.id, "chat profile synced");
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> Result<String, ChatError> {
        self.sign(&UserTokenClaims { user_id })
    }
}

/// Used when no chat credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ChatError> {
        tracing::debug!(user_id = %user.id, "chat disabled, skipping profile sync");
        Ok(())
    }

    fn create_token(&self, _user_id: &str) -> Result<String, ChatError> {
        Err(ChatError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Deserialize)]
    struct Decoded {
        user_id: String,
    }

    #[derive(Deserialize)]
    struct ServerClaims {
        server: bool,
    }

    fn config() -> StreamConfig {
        StreamConfig {
            api_key: "key".into(),
            api_secret: "secret".into(),
        }
    }

    fn stream() -> StreamChat {
        StreamChat::new(&config()).unwrap()
    }

    fn no_exp_validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }

    #[derive(Debug, Clone)]
    struct Captured {
        query: HashMap<String, String>,
        headers: HeaderMap,
        body: Value,
    }

    #[derive(Clone)]
    struct MockStream {
        status: StatusCode,
        captured: Arc<Mutex<Option<Captured>>>,
    }

    async fn upsert_users(
        State(mock): State<MockStream>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, &'static str) {
        *mock.captured.lock().unwrap() = Some(Captured { query, headers, body });
        (mock.status, "upstream says no")
    }

    /// Serves a fake `/users` endpoint answering `status`, and returns its base url.
    async fn spawn_stream(status: StatusCode) -> (String, Arc<Mutex<Option<Captured>>>) {
        let captured = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route("/users", post(upsert_users))
            .with_state(MockStream { status, captured: captured.clone() });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (address, captured)
    }

    fn alice() -> ChatUser {
        ChatUser {
            id: "user-1".into(),
            name: "Alice Walker".into(),
            image: "https://example.com/a.png".into(),
        }
    }

    #[tokio::test]
    async fn upsert_posts_users_map_with_server_token() {
        let (base_url, captured) = spawn_stream(StatusCode::CREATED).await;
        let chat = StreamChat::with_base_url(&config(), &base_url).unwrap();

        chat.upsert_user(&alice()).await.unwrap();

        let request = captured.lock().unwrap().clone().expect("no request reached the server");
        assert_eq!(request.query.get("api_key").map(String::as_str), Some("key"));
        assert_eq!(request.headers["stream-auth-type"], "jwt");

        let token = request.headers["authorization"].to_str().unwrap();
        let claims = decode::<ServerClaims>(token, &DecodingKey::from_secret(b"secret"), &no_exp_validation())
            .unwrap()
            .claims;
        assert!(claims.server);

        assert_eq!(
            request.body,
            json!({
                "users": {
                    "user-1": {
                        "id": "user-1",
                        "name": "Alice Walker",
                        "image": "https://example.com/a.png"
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn upsert_maps_non_success_to_rejected() {
        let (base_url, _) = spawn_stream(StatusCode::INTERNAL_SERVER_ERROR).await;
        let chat = StreamChat::with_base_url(&config(), &base_url).unwrap();

        match chat.upsert_user(&alice()).await {
            Err(ChatError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream says no");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn upsert_gives_up_on_a_silent_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            // Accept and hold the connection open without answering.
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });
        let chat = StreamChat::with_base_url(&config(), &base_url).unwrap();

        let result = tokio::time::timeout(REQUEST_TIMEOUT * 2, chat.upsert_user(&alice()))
            .await
            .expect("request outlived the client timeout");
        match result {
            Err(ChatError::Http(err)) => assert!(err.is_timeout()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn user_token_is_signed_with_api_secret() {
        let token = stream().create_token("user-1").unwrap();

        let validation = no_exp_validation();
        let decoded = decode::<Decoded>(&token, &DecodingKey::from_secret(b"secret"), &validation).unwrap();
        assert_eq!(decoded.claims.user_id, "user-1");

        assert!(decode::<Decoded>(&token, &DecodingKey::from_secret(b"other"), &validation).is_err());
    }

    #[tokio::test]
    async fn disabled_chat_syncs_silently_but_issues_no_tokens() {
        let chat = DisabledChat;
        let user = ChatUser {
            id: "u".into(),
            name: "Alice".into(),
            image: String::new(),
        };
        assert!(chat.upsert_user(&user).await.is_ok());
        assert!(matches!(chat.create_token("u"), Err(ChatError::Disabled)));
    }
}

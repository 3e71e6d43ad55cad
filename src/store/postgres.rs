// src/store/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    models::{
        friend_request::{
            FriendRequest, FriendRequestStatus, FriendRequestWithRecipient, FriendRequestWithSender,
            NewFriendRequest, StatusFilter,
        },
        metadata::Metadata,
        pagination::{PageRequest, RequestListQuery},
        search::search_tokens,
        user::{NewUser, RecommendedUser, User},
    },
    store::{
        FriendRequestLedger, Store, StoreError, StoreResult, UserDirectory, bounded, clean_friend_ids,
        pipeline::{Fragment, Pipeline, Value, name_search},
    },
};

const USER_COLUMNS: &str = "u.id, u.full_name, u.email, u.password_hash, u.bio, u.profile_pic, \
     u.native_lng, u.learning_lng, u.location, u.is_onboarded, u.friend_ids, u.created_at, u.updated_at";

const REQUEST_COLUMNS: &str = "id, sender_id, recipient_id, status, created_at, updated_at";

/// Request columns aliased with `fr_` so the joined profile can keep plain names.
const JOINED_COLUMNS: &str = "fr.id AS fr_id, fr.sender_id AS fr_sender_id, \
     fr.recipient_id AS fr_recipient_id, fr.status AS fr_status, fr.created_at AS fr_created_at, \
     fr.updated_at AS fr_updated_at, u.id, u.full_name, u.email, u.password_hash, u.bio, \
     u.profile_pic, u.native_lng, u.learning_lng, u.location, u.is_onboarded, u.friend_ids, \
     u.created_at, u.updated_at";

/// Represents a row of the 'users' table.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    password_hash: String,
    bio: String,
    profile_pic: String,
    native_lng: String,
    learning_lng: String,
    location: String,
    is_onboarded: bool,
    friend_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            bio: row.bio,
            profile_pic: row.profile_pic,
            native_lng: row.native_lng,
            learning_lng: row.learning_lng,
            location: row.location,
            is_onboarded: row.is_onboarded,
            friend_ids: row.friend_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecommendedRow {
    #[sqlx(flatten)]
    user: UserRow,
    has_friend_request: bool,
}

/// Represents a row of the 'friend_requests' table.
#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for FriendRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(FriendRequest {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A request joined with one side's profile.
#[derive(Debug, FromRow)]
struct JoinedRequestRow {
    fr_id: Uuid,
    fr_sender_id: Uuid,
    fr_recipient_id: Uuid,
    fr_status: String,
    fr_created_at: DateTime<Utc>,
    fr_updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    profile: UserRow,
}

impl JoinedRequestRow {
    fn split(self) -> StoreResult<(FriendRequest, User)> {
        let request = FriendRequest {
            id: self.fr_id,
            sender_id: self.fr_sender_id,
            recipient_id: self.fr_recipient_id,
            status: parse_status(&self.fr_status)?,
            created_at: self.fr_created_at,
            updated_at: self.fr_updated_at,
        };
        Ok((request, self.profile.into()))
    }
}

fn parse_status(raw: &str) -> StoreResult<FriendRequestStatus> {
    raw.parse::<FriendRequestStatus>()
        .map_err(|msg| StoreError::Database(sqlx::Error::Decode(msg.into())))
}

fn map_unique_violation(err: sqlx::Error, duplicate: StoreError) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate,
        _ => StoreError::Database(err),
    }
}

/// Appends one direction of a friendship. Returns the number of rows touched
/// (0 when already linked, self-referencing, or the user is missing).
async fn append_friend<'e, E>(executor: E, user_id: Uuid, friend_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET friend_ids = array_append(friend_ids, $2), updated_at = now()
        WHERE id = $1 AND id <> $2 AND NOT ($2 = ANY(friend_ids))
        "#,
    )
    .bind(user_id)
    .bind(friend_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

async fn user_exists<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
}

fn status_filter(column: &'static str, status: StatusFilter) -> Option<Fragment> {
    match status {
        StatusFilter::All => None,
        StatusFilter::Only(status) => Some(
            Fragment::sql(format!("{} = ", column)).bind(Value::Text(status.as_str().to_string())),
        ),
    }
}

/// PostgreSQL-backed store. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    fn request_listing(
        &self,
        join_on: &'static str,
        owner_column: &'static str,
        owner_id: Uuid,
        query: &RequestListQuery,
    ) -> Pipeline {
        Pipeline::from(join_on, JOINED_COLUMNS)
            .filter(Fragment::sql(format!("{} = ", owner_column)).bind(Value::Uuid(owner_id)))
            .filter_opt(status_filter("fr.status", query.status))
            .filter_opt(name_search("u.full_name", &search_tokens(&query.search)))
            .sort_by("fr.created_at DESC")
            .sort_by("fr.id ASC")
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {} FROM users u WHERE u.email = $1", USER_COLUMNS);
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
                .map(User::from)
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<User> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(User::from)
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        bounded(self.timeout, async {
            let sql = format!(
                r#"
                INSERT INTO users AS u (id, full_name, email, password_hash, profile_pic, friend_ids, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, '{{}}', now(), now())
                RETURNING {}
                "#,
                USER_COLUMNS
            );
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(Uuid::new_v4())
                .bind(&user.full_name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.profile_pic)
                .fetch_one(&self.pool)
                .await
                .map(User::from)
                .map_err(|e| map_unique_violation(e, StoreError::DuplicateEmail))
        })
        .await
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let friend_ids = clean_friend_ids(user.id, &user.friend_ids);
        bounded(self.timeout, async {
            let sql = format!(
                r#"
                UPDATE users AS u
                SET full_name = $2, bio = $3, profile_pic = $4, native_lng = $5,
                    learning_lng = $6, location = $7, is_onboarded = $8, friend_ids = $9,
                    updated_at = now()
                WHERE u.id = $1
                RETURNING {}
                "#,
                USER_COLUMNS
            );
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(user.id)
                .bind(&user.full_name)
                .bind(&user.bio)
                .bind(&user.profile_pic)
                .bind(&user.native_lng)
                .bind(&user.learning_lng)
                .bind(&user.location)
                .bind(user.is_onboarded)
                .bind(&friend_ids)
                .fetch_optional(&self.pool)
                .await?
                .map(User::from)
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> StoreResult<()> {
        bounded(self.timeout, async {
            let touched = append_friend(&self.pool, user_id, friend_id).await?;
            if touched == 0 && !user_exists(&self.pool, user_id).await? {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn recommended(
        &self,
        current: &User,
        page: &PageRequest,
    ) -> StoreResult<(Vec<RecommendedUser>, Metadata)> {
        let me = current.id;
        let pipeline = Pipeline::from("users u", USER_COLUMNS)
            .annotate(
                Fragment::sql("EXISTS (SELECT 1 FROM friend_requests fr WHERE (fr.sender_id = ")
                    .bind(Value::Uuid(me))
                    .push(" AND fr.recipient_id = u.id) OR (fr.sender_id = u.id AND fr.recipient_id = ")
                    .bind(Value::Uuid(me))
                    .push(")) AS has_friend_request"),
            )
            .filter(Fragment::sql("u.id <> ").bind(Value::Uuid(me)))
            .filter(
                Fragment::sql("NOT (u.id = ANY(")
                    .bind(Value::Uuids(current.friend_ids.clone()))
                    .push("))"),
            )
            .filter(Fragment::sql("u.is_onboarded"))
            .sort_by("has_friend_request ASC")
            .sort_by("u.created_at ASC")
            .sort_by("u.id ASC");

        bounded(self.timeout, async {
            let (rows, total) = pipeline.fetch_page::<RecommendedRow>(&self.pool, page).await?;
            let users = rows
                .into_iter()
                .map(|row| RecommendedUser {
                    user: row.user.into(),
                    has_friend_request: row.has_friend_request,
                })
                .collect();
            Ok((users, Metadata::calculate(total, page)))
        })
        .await
    }

    async fn my_friends(
        &self,
        current: &User,
        search: &str,
        page: &PageRequest,
    ) -> StoreResult<(Vec<User>, Metadata)> {
        let pipeline = Pipeline::from("users u", USER_COLUMNS)
            .filter(
                Fragment::sql("u.id = ANY(")
                    .bind(Value::Uuids(current.friend_ids.clone()))
                    .push(")"),
            )
            .filter(Fragment::sql("u.is_onboarded"))
            .filter_opt(name_search("u.full_name", &search_tokens(search)))
            .sort_by("u.full_name ASC")
            .sort_by("u.id ASC");

        bounded(self.timeout, async {
            let (rows, total) = pipeline.fetch_page::<UserRow>(&self.pool, page).await?;
            let users = rows.into_iter().map(User::from).collect();
            Ok((users, Metadata::calculate(total, page)))
        })
        .await
    }
}

#[async_trait]
impl FriendRequestLedger for PgStore {
    async fn get_request_by_id(&self, id: Uuid) -> StoreResult<FriendRequest> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {} FROM friend_requests WHERE id = $1", REQUEST_COLUMNS);
            sqlx::query_as::<_, RequestRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?
                .try_into()
        })
        .await
    }

    async fn check_existing(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        bounded(self.timeout, async {
            let exists = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM friend_requests
                    WHERE (sender_id = $1 AND recipient_id = $2)
                       OR (sender_id = $2 AND recipient_id = $1)
                )
                "#,
            )
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists)
        })
        .await
    }

    async fn create_request(&self, request: NewFriendRequest) -> StoreResult<FriendRequest> {
        bounded(self.timeout, async {
            let sql = format!(
                r#"
                INSERT INTO friend_requests (id, sender_id, recipient_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, now(), now())
                RETURNING {}
                "#,
                REQUEST_COLUMNS
            );
            sqlx::query_as::<_, RequestRow>(&sql)
                .bind(Uuid::new_v4())
                .bind(request.sender_id)
                .bind(request.recipient_id)
                .bind(FriendRequestStatus::Pending.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_unique_violation(e, StoreError::DuplicateRequest))?
                .try_into()
        })
        .await
    }

    async fn update_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest> {
        bounded(self.timeout, async {
            let sql = format!(
                "UPDATE friend_requests SET status = $2, updated_at = now() WHERE id = $1 RETURNING {}",
                REQUEST_COLUMNS
            );
            sqlx::query_as::<_, RequestRow>(&sql)
                .bind(request.id)
                .bind(request.status.as_str())
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?
                .try_into()
        })
        .await
    }

    async fn list_incoming(
        &self,
        recipient_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithSender>, Metadata)> {
        let pipeline = self.request_listing(
            "friend_requests fr JOIN users u ON u.id = fr.sender_id",
            "fr.recipient_id",
            recipient_id,
            query,
        );

        bounded(self.timeout, async {
            let (rows, total) = pipeline
                .fetch_page::<JoinedRequestRow>(&self.pool, &query.page)
                .await?;
            let items = rows
                .into_iter()
                .map(|row| {
                    row.split()
                        .map(|(request, sender)| FriendRequestWithSender { request, sender })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            Ok((items, Metadata::calculate(total, &query.page)))
        })
        .await
    }

    async fn list_outgoing(
        &self,
        sender_id: Uuid,
        query: &RequestListQuery,
    ) -> StoreResult<(Vec<FriendRequestWithRecipient>, Metadata)> {
        let pipeline = self.request_listing(
            "friend_requests fr JOIN users u ON u.id = fr.recipient_id",
            "fr.sender_id",
            sender_id,
            query,
        );

        bounded(self.timeout, async {
            let (rows, total) = pipeline
                .fetch_page::<JoinedRequestRow>(&self.pool, &query.page)
                .await?;
            let items = rows
                .into_iter()
                .map(|row| {
                    row.split()
                        .map(|(request, recipient)| FriendRequestWithRecipient { request, recipient })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            Ok((items, Metadata::calculate(total, &query.page)))
        })
        .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<FriendRequest> {
        bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let sql = format!(
                r#"
                UPDATE friend_requests
                SET status = $2, updated_at = now()
                WHERE id = $1 AND status = $3
                RETURNING {}
                "#,
                REQUEST_COLUMNS
            );
            let row = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(request.id)
                .bind(FriendRequestStatus::Accepted.as_str())
                .bind(FriendRequestStatus::Pending.as_str())
                .fetch_optional(&mut *tx)
                .await?;

            let accepted: FriendRequest = match row {
                Some(row) => row.try_into()?,
                None => {
                    let exists = sqlx::query_scalar::<_, bool>(
                        "SELECT EXISTS (SELECT 1 FROM friend_requests WHERE id = $1)",
                    )
                    .bind(request.id)
                    .fetch_one(&mut *tx)
                    .await?;
                    return Err(if exists { StoreError::NotPending } else { StoreError::NotFound });
                }
            };

            append_friend(&mut *tx, accepted.recipient_id, accepted.sender_id).await?;
            append_friend(&mut *tx, accepted.sender_id, accepted.recipient_id).await?;

            // Dropping `tx` on any early return above rolls everything back.
            tx.commit().await?;
            Ok(accepted)
        })
        .await
    }
}

// src/models/friend_request.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Lifecycle of a friend request.
///
/// Only `Pending -> Accepted` exists today. New states (rejected, withdrawn)
/// slot in here together with a matching `as_str` / `FromStr` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "Pending",
            FriendRequestStatus::Accepted => "Accepted",
        }
    }
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FriendRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(FriendRequestStatus::Pending),
            "Accepted" => Ok(FriendRequestStatus::Accepted),
            other => Err(format!("unknown friend request status '{}'", other)),
        }
    }
}

/// Status filter for the request listings. `All` disables the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(FriendRequestStatus),
}

impl StatusFilter {
    pub fn admits(&self, status: FriendRequestStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            return Ok(StatusFilter::All);
        }
        s.parse::<FriendRequestStatus>()
            .map(StatusFilter::Only)
            .map_err(|_| "must be one of All, Pending, Accepted".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn involves(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.recipient_id == b)
            || (self.sender_id == b && self.recipient_id == a)
    }
}

/// Input for `FriendRequestLedger::create_request`. Status and timestamps are set by the store.
#[derive(Debug, Clone)]
pub struct NewFriendRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
}

/// Incoming request joined with the sender's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestWithSender {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub sender: User,
}

/// Outgoing request joined with the recipient's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestWithRecipient {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub recipient: User,
}

/// Order-independent key of a user pair; `(min, max)`.
pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

// src/models/user.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A user account. Also serves as the public profile embedded in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,

    pub full_name: String,

    /// Unique across all users.
    pub email: String,

    /// Argon2 PHC string (salt included).
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    pub bio: String,
    pub profile_pic: String,
    pub native_lng: String,
    pub learning_lng: String,
    pub location: String,

    /// Set once the profile-setup step has been completed.
    pub is_onboarded: bool,

    /// Accepted friendships, in acceptance order. Never contains `id`.
    pub friend_ids: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_friend_with(&self, other: Uuid) -> bool {
        self.friend_ids.contains(&other)
    }
}

/// Input for `UserDirectory::insert_user`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: String,
}

/// Placeholder avatar given to every new account.
pub fn random_avatar() -> String {
    let idx = rand::thread_rng().gen_range(1..=100);
    format!("https://avatar.iran.liara.run/public/{}.png", idx)
}

/// Recommended candidate with its friend-request relationship to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedUser {
    #[serde(flatten)]
    pub user: User,
    /// True when a request exists between the caller and this user, in either direction.
    pub has_friend_request: bool,
}

/// DTO for creating a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 255, message = "must be between 3 and 255 characters"))]
    pub fullname: String,

    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(
        length(min = 8, max = 32, message = "must be between 8 and 32 characters"),
        custom(function = validate_password_strength)
    )]
    pub password: String,
}

/// DTO for signing in.
#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "must be provided"))]
    pub password: String,
}

/// DTO for the profile-setup step.
#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 255, message = "must be between 3 and 255 characters"))]
    pub fullname: String,

    #[serde(default)]
    #[validate(length(min = 10, max = 255, message = "must be between 10 and 255 characters"))]
    pub bio: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub native_lng: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub learning_lng: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub location: String,

    /// Optional replacement avatar.
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub profile_pic: Option<String>,
}

impl OnboardingRequest {
    /// Trims every text field; validation runs on the trimmed values.
    pub fn trimmed(self) -> Self {
        OnboardingRequest {
            fullname: self.fullname.trim().to_string(),
            bio: self.bio.trim().to_string(),
            native_lng: self.native_lng.trim().to_string(),
            learning_lng: self.learning_lng.trim().to_string(),
            location: self.location.trim().to_string(),
            profile_pic: self
                .profile_pic
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }
}

/// Requires at least one uppercase letter, one digit and one special character.
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if has_upper && has_digit && has_special {
        return Ok(());
    }
    Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(
        "must contain an uppercase letter, a digit and a special character",
    )))
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    if Url::parse(url).is_err() {
        return Err(ValidationError::new("invalid_url").with_message(Cow::Borrowed("must be a valid url")));
    }
    Ok(())
}

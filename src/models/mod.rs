// src/models/mod.rs

pub mod friend_request;
pub mod metadata;
pub mod pagination;
pub mod search;
pub mod user;

// src/handlers/mod.rs

pub mod auth;
pub mod chat;
pub mod friend_requests;
pub mod users;

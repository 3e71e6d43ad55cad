// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{chat::ChatProvider, config::Config, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub chat: Arc<dyn ChatProvider>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, chat: Arc<dyn ChatProvider>, config: Config) -> Self {
        Self { store, chat, config }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ChatProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

//! Library entrypoint for the bills admin panel.
//!
//! `main.rs` only wires logging and the listener; integration tests under
//! `tests/` build the same state and router with in-memory providers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

pub mod services;

#[path = "views/flash.rs"]
pub mod flash;
#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

use error::ConfigError;
use services::{
    credentials::GoogleAuth,
    fcm::{FcmClient, Messenger},
    firestore::{DocumentStore, FirestoreClient},
    notification_service::NotificationDispatcher,
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub settings: config::Settings,
    pub store: Arc<dyn DocumentStore>,
    pub notifier: NotificationDispatcher,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        hbs: templates::Hbs,
        store: Arc<dyn DocumentStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(store.clone(), messenger);
        Self {
            hbs,
            settings,
            store,
            notifier,
        }
    }
}

/// Startup phase: templates, the authenticated provider handle, and the
/// store and messaging clients built on it. Any failure here is fatal.
pub fn connect(settings: config::Settings) -> Result<AppState, ConfigError> {
    let hbs = templates::build_handlebars()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let auth = GoogleAuth::new(http, settings.service_account.clone())?;
    tracing::info!(project = auth.project_id(), "provider credentials loaded");

    let store = Arc::new(FirestoreClient::new(
        auth.clone(),
        settings.firestore_base_url.clone(),
    ));
    let messenger = Arc::new(FcmClient::new(auth, settings.fcm_base_url.clone()));

    Ok(AppState::new(settings, hbs, store, messenger))
}

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tera::Tera;

use crate::auth::ResetTokens;
use crate::config::AppConfig;
use crate::mail::Mailer;
use crate::services::posts::PostService;
use crate::services::users::UserService;

/// Everything a handler may reach besides the request itself.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserService>,
    pub posts: Arc<dyn PostService>,
    pub mailer: Arc<dyn Mailer>,
    pub tera: Arc<Tera>,
    pub key: Key,
    pub reset_tokens: ResetTokens,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserService>,
        posts: Arc<dyn PostService>,
        mailer: Arc<dyn Mailer>,
        tera: Tera,
        key: Key,
    ) -> Self {
        let reset_tokens = ResetTokens::new(key.signing(), config.reset_token_ttl_secs);
        Self {
            users,
            posts,
            mailer,
            tera: Arc::new(tera),
            key,
            reset_tokens,
            config: Arc::new(config),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.upload_dir)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

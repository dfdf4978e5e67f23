pub mod tracing;

use axum_extra::extract::cookie::Key;
use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Settings read from `appsettings.json`, overridden by `APP_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Postgres URL. Without one the app keeps everything in memory.
    pub database_url: Option<String>,
    pub db_pool_size: usize,
    pub listen_addr: String,
    /// Signs session cookies and reset tokens. At least 64 bytes.
    pub secret_key: Option<String>,
    pub templates: String,
    pub static_dir: String,
    pub upload_dir: String,
    /// Base for links that leave the site, like the one in reset emails.
    pub public_url: String,
    pub mail_sender: String,
    pub reset_token_ttl_secs: i64,
    pub posts_per_page: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_pool_size: 10,
            listen_addr: "0.0.0.0:3000".into(),
            secret_key: None,
            templates: "templates/**/*".into(),
            static_dir: "static".into(),
            upload_dir: "static/profile_pics".into(),
            public_url: "http://localhost:3000".into(),
            mail_sender: "noreply@demo.com".into(),
            reset_token_ttl_secs: 1800,
            posts_per_page: 5,
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Json::file("appsettings.json"))
            .merge(Env::prefixed("APP_"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Key for signed cookies. A missing secret gets a random key, so sessions don't
    /// survive a restart.
    pub fn cookie_key(&self) -> anyhow::Result<Key> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes())
                .map_err(|e| anyhow::anyhow!("secret_key is unusable: {e}")),
            None => {
                ::tracing::warn!("no secret_key configured, generating a throwaway one");
                Ok(Key::generate())
            }
        }
    }
}

mod auth;
mod config;
mod db;
mod error;
mod forms;
mod mail;
mod middleware;
mod models;
mod routes;
mod schema;
mod services;
mod state;
mod uploads;
mod views;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tera::Tera;
use tracing::*;

use config::AppConfig;
use mail::LogMailer;
use services::memory::MemoryStore;
use services::posts::{PostService, PostServiceDb};
use services::users::{UserService, UserServiceDb};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::tracing::init();

    let cfg = AppConfig::load()?;
    let key = cfg.cookie_key()?;

    let (users, posts): (Arc<dyn UserService>, Arc<dyn PostService>) = match &cfg.database_url {
        Some(url) => {
            db::run_migrations(url).await?;
            let pool = db::build_pool(url, cfg.db_pool_size)?;
            (
                Arc::new(UserServiceDb::new(pool.clone())),
                Arc::new(PostServiceDb::new(pool)),
            )
        }
        None => {
            warn!("no database_url configured, keeping users and posts in memory");
            let store = MemoryStore::new();
            (Arc::new(store.clone()), Arc::new(store))
        }
    };

    let tera = Tera::new(&cfg.templates)?;
    let addr = cfg.listen_addr.clone();

    let state = AppState::new(cfg, users, posts, Arc::new(LogMailer), tera, key);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("starting listening at {}", addr);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

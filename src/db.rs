use anyhow::anyhow;
use diesel::Connection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::{Hook, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn build_pool(
    database_url: &str,
    max_size: usize,
) -> anyhow::Result<Pool<AsyncPgConnection>> {
    let mgr = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

    info!(max_size, "Starting DB pool");
    let pool = Pool::builder(mgr)
        .max_size(max_size)
        .post_create(Hook::async_fn(|conn, metrics| {
            tracing::trace_span!("dbpool::post_create").in_scope(|| {
                let c = std::ptr::addr_of!(conn);
                tracing::trace!(?c, ?metrics, "Post-create");
                Box::pin(std::future::ready(Ok(())))
            })
        }))
        .build()?;

    Ok(pool)
}

/// Applies any embedded migrations the database hasn't seen yet.
pub async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&url)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("running migrations: {e}"))?;
        info!(count = applied.len(), "applied pending migrations");
        Ok(())
    })
    .await?
}

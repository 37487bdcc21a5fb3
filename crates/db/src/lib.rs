//! Persisted row models and the Postgres connection pool bootstrap.
//!
//! The teacher reaches `mongodb`/`bson` for this; spec.md §6 calls the
//! persisted layout "relational tables" with a named composite index, so
//! this crate targets `sqlx`+Postgres instead (see DESIGN.md).

pub mod models;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub use models::*;

/// Embedded SQL migrations (spec.md §3/§6 tables). Run once at startup,
/// the `sqlx::migrate!()` analog of the teacher's `ensure_indexes`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Opens the process-wide connection pool and applies pending migrations.
///
/// Mirrors the teacher's "initialized once at startup, read-only handle
/// passed through a top-level context" treatment of its Mongo `Database`
/// (spec.md §5/§9 global-state guidance).
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("connecting to Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    MIGRATOR.run(&pool).await.map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    info!("migrations applied");

    Ok(pool)
}

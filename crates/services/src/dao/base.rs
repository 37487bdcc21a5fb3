//! Generic repository shape kept from the teacher's `BaseDao<T>`
//! (`crates/services/src/dao/*.rs`), retargeted from a Mongo collection
//! wrapper to a `sqlx::PgPool` table repository (see DESIGN.md).

use std::marker::PhantomData;

use serde::Serialize;
use sqlx::postgres::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DaoError {
    #[error("resource not found")]
    NotFound,
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type DaoResult<T> = Result<T, DaoError>;

/// Pagination parameters shared by every entity listing, mirroring the
/// teacher's `PaginationParams`/`PaginatedResult` pair.
#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub limit: i64,
    pub offset: i64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// A thin, table-scoped handle shared by the per-entity DAOs. Each DAO
/// owns its own insert/query methods (columns differ too much across
/// entities for a single generic insert to stay readable); `BaseDao`
/// only carries what every entity needs: id lookup, existence checks,
/// counting, and age-based deletion for `RetentionJob`.
#[derive(Clone)]
pub struct BaseDao<T> {
    pool: PgPool,
    table: &'static str,
    _marker: PhantomData<T>,
}

impl<T> BaseDao<T>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _marker: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_id(&self, id: Uuid) -> DaoResult<T> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", self.table);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn exists(&self, id: Uuid) -> DaoResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", self.table);
        let row: (bool,) = sqlx::query_as(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    pub async fn count(&self) -> DaoResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let row: (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    /// Sweeps rows older than `cutoff` by `created_at`, deleting unless
    /// `dry_run`. Returns `(matched, min_id, max_id)` for the
    /// `RetentionAuditRecord` the caller writes. Used by `RetentionJob`
    /// (spec.md §4.11) across every table it sweeps.
    pub async fn sweep_older_than(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        dry_run: bool,
    ) -> DaoResult<(i64, Option<Uuid>, Option<Uuid>)> {
        if dry_run {
            let sql = format!(
                "SELECT COUNT(*), MIN(id), MAX(id) FROM {} WHERE created_at < $1",
                self.table
            );
            let row: (i64, Option<Uuid>, Option<Uuid>) =
                sqlx::query_as(&sql).bind(cutoff).fetch_one(&self.pool).await?;
            return Ok(row);
        }

        let sql = format!(
            "DELETE FROM {} WHERE created_at < $1 RETURNING id",
            self.table
        );
        let rows: Vec<(Uuid,)> = sqlx::query_as(&sql).bind(cutoff).fetch_all(&self.pool).await?;
        let count = rows.len() as i64;
        let min_id = rows.iter().map(|(id,)| *id).min();
        let max_id = rows.iter().map(|(id,)| *id).max();
        Ok((count, min_id, max_id))
    }
}

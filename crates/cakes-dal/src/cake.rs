use std::future::Future;

use futures::{StreamExt as _, TryStreamExt as _};
use sqlx::{Executor as _, Statement as _, sqlite::SqliteStatement};
use time::OffsetDateTime;
use tracing::debug;

use crate::{Error, ListingParams, Pool, check_table_name, error::Result};

const COLUMNS: &str = "id, title, description, rating, image, created_at, updated_at, deleted_at";

/// Cake row as persisted, including soft deleted marker.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Cake {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub rating: f32,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// Mutable part of a cake, written by insert and update.
#[derive(Debug, Clone, PartialEq)]
pub struct CakeFields {
    pub title: String,
    pub description: Option<String>,
    pub rating: f32,
    pub image: Option<String>,
}

/// Access to cakes storage.
///
/// Every read is limited to rows which are not soft deleted.
/// Update and soft delete do not report whether the row existed,
/// callers that care must check with [`CakeStore::get`] first.
pub trait CakeStore: Send + Sync + 'static {
    /// Page of cakes ordered by rating (highest first), then by title.
    fn list(&self, params: ListingParams) -> impl Future<Output = Result<Vec<Cake>>> + Send;

    fn count(&self) -> impl Future<Output = Result<i64>> + Send;

    /// `None` when there is no such (visible) cake.
    fn get(&self, id: i64) -> impl Future<Output = Result<Option<Cake>>> + Send;

    /// Returns id assigned by the store.
    fn insert(&self, fields: CakeFields) -> impl Future<Output = Result<i64>> + Send;

    fn update(&self, id: i64, fields: CakeFields) -> impl Future<Output = Result<()>> + Send;

    fn soft_delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;
}

struct Statements {
    list: SqliteStatement<'static>,
    count: SqliteStatement<'static>,
    get: SqliteStatement<'static>,
    insert: SqliteStatement<'static>,
    update: SqliteStatement<'static>,
    soft_delete: SqliteStatement<'static>,
}

async fn prepare(pool: &Pool, name: &'static str, sql: String) -> Result<SqliteStatement<'static>> {
    let statement = pool
        .prepare(&sql)
        .await
        .map_err(|source| Error::PrepareError { name, source })?;
    debug!("Prepared {name} statement: {sql}");
    Ok(sqlx::Statement::to_owned(&statement))
}

/// SQL backed [`CakeStore`], statements are prepared once in [`CakeRepository::new`].
pub struct CakeRepository {
    pool: Pool,
    statements: Statements,
}

impl CakeRepository {
    /// Fails if table name is not a plain identifier or any statement cannot be prepared
    /// (typically because table does not exist).
    pub async fn new(pool: Pool, table: &str) -> Result<Self> {
        check_table_name(table)?;
        let statements = Statements {
            list: prepare(
                &pool,
                "list",
                format!(
                    "SELECT {COLUMNS} FROM {table} WHERE deleted_at IS NULL \
                     ORDER BY rating DESC, title ASC LIMIT ? OFFSET ?"
                ),
            )
            .await?,
            count: prepare(
                &pool,
                "count",
                format!("SELECT COUNT(*) FROM {table} WHERE deleted_at IS NULL"),
            )
            .await?,
            get: prepare(
                &pool,
                "get",
                format!("SELECT {COLUMNS} FROM {table} WHERE deleted_at IS NULL AND id = ? LIMIT 1"),
            )
            .await?,
            insert: prepare(
                &pool,
                "insert",
                format!(
                    "INSERT INTO {table} (title, description, rating, image, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?)"
                ),
            )
            .await?,
            update: prepare(
                &pool,
                "update",
                format!(
                    "UPDATE {table} SET title = ?, description = ?, rating = ?, image = ?, updated_at = ? \
                     WHERE id = ?"
                ),
            )
            .await?,
            soft_delete: prepare(
                &pool,
                "soft_delete",
                format!("UPDATE {table} SET deleted_at = ? WHERE id = ?"),
            )
            .await?,
        };
        Ok(Self { pool, statements })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl CakeStore for CakeRepository {
    async fn list(&self, params: ListingParams) -> Result<Vec<Cake>> {
        let records = self
            .statements
            .list
            .query_as::<Cake>()
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.pool)
            .take(usize::try_from(params.limit).unwrap_or_default())
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = self
            .statements
            .count
            .query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get(&self, id: i64) -> Result<Option<Cake>> {
        let record = self
            .statements
            .get
            .query_as::<Cake>()
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn insert(&self, fields: CakeFields) -> Result<i64> {
        let created = OffsetDateTime::now_utc();
        let result = self
            .statements
            .insert
            .query()
            .bind(fields.title)
            .bind(fields.description)
            .bind(fields.rating)
            .bind(fields.image)
            .bind(created)
            .bind(created)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&self, id: i64, fields: CakeFields) -> Result<()> {
        self.statements
            .update
            .query()
            .bind(fields.title)
            .bind(fields.description)
            .bind(fields.rating)
            .bind(fields.image)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        self.statements
            .soft_delete
            .query()
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

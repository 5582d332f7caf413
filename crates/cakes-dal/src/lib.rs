pub mod cake;
pub mod error;

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{Executor as _, sqlite::SqlitePoolOptions};
use tracing::info;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type Pool = sqlx::Pool<ChosenDB>;

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Table names are interpolated into statement text, so only plain identifiers pass.
pub fn check_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTableName(table.to_string()))
    }
}

pub async fn create_table(pool: &Pool, table: &str) -> Result<()> {
    check_table_name(table)?;
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            rating REAL NOT NULL,
            image TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            deleted_at DATETIME
        )"
    );
    pool.execute(sql.as_str()).await?;
    info!("Table {table} is ready");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert!(check_table_name("cakes").is_ok());
        assert!(check_table_name("_cakes_2").is_ok());
        assert!(check_table_name("").is_err());
        assert!(check_table_name("2cakes").is_err());
        assert!(check_table_name("cakes; DROP TABLE x").is_err());
        assert!(check_table_name("cakes-old").is_err());
    }
}

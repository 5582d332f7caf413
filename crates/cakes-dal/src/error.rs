pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Failed to prepare {name} statement: {source}")]
    PrepareError {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

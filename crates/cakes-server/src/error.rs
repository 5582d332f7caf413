pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    ArgumentsError(#[from] clap::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] cakes_dal::Error),

    #[error("Invalid listen address: {0}")]
    AddressError(#[from] std::net::AddrParseError),

    #[error("Invalid url: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<cakes_dal::SqlxError> for Error {
    fn from(e: cakes_dal::SqlxError) -> Self {
        Error::DatabaseError(e.into())
    }
}

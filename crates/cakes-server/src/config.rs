use std::time::Duration;

use crate::error::Result;
pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 8081,
        env = "CAKES_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "CAKES_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "CAKES_DATABASE_URL",
        default_value = "sqlite://cakes.db?mode=rwc",
        help = "Database URL e.g. sqlite://file.db"
    )]
    pub database_url: String,

    #[arg(
        long,
        env = "CAKES_TABLE_NAME",
        default_value = "cakes",
        help = "Name of the table holding cakes"
    )]
    pub table_name: String,

    #[arg(
        long,
        env = "CAKES_CREATE_TABLE",
        help = "Create cakes table on start, if it does not exist"
    )]
    pub create_table: bool,

    #[arg(
        long,
        env = "CAKES_SHUTDOWN_GRACE",
        default_value = "5s",
        help = "How long to wait for database connections to close on shutdown (e.g. 5s, 1m)",
        value_parser = humantime::parse_duration
    )]
    pub shutdown_grace: Duration,

    #[arg(long, env = "CAKES_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    /// Url of the running server, with unspecified address replaced by localhost.
    pub fn base_url(&self) -> Result<Url> {
        let host = match self.listen_address.as_str() {
            "0.0.0.0" | "::" => "localhost",
            address => address,
        };
        let url = if host.contains(':') {
            format!("http://[{}]:{}/", host, self.port)
        } else {
            format!("http://{}:{}/", host, self.port)
        };
        Ok(Url::parse(&url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["cakes-server"]).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.table_name, "cakes");
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert!(!config.create_table);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://127.0.0.1:8081/"
        );
    }

    #[test]
    fn test_arguments() {
        let config = ServerConfig::try_parse_from([
            "cakes-server",
            "--port",
            "3333",
            "--listen-address",
            "0.0.0.0",
            "--table-name",
            "pastry",
            "--create-table",
            "--shutdown-grace",
            "1m 30s",
        ])
        .unwrap();
        assert_eq!(config.port, 3333);
        assert_eq!(config.table_name, "pastry");
        assert!(config.create_table);
        assert_eq!(config.shutdown_grace, Duration::from_secs(90));
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:3333/");

        let invalid = ServerConfig::try_parse_from(["cakes-server", "--port", "cake"]);
        assert!(invalid.is_err());
    }
}

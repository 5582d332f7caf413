pub mod rest;

use anyhow::{Result, anyhow};
use cakes_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::debug;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    data_dir: TempDir,
}

impl ConfigGuard {
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}/cakes.db?mode=rwc",
            self.data_dir.path().to_string_lossy()
        )
    }
}

pub fn test_config(test_name: &str, extra_args: &[&str]) -> Result<(ServerConfig, ConfigGuard)> {
    let guard = ConfigGuard {
        data_dir: TempDir::with_prefix(format!("{}_", test_name))?,
    };
    let database_url = guard.database_url();
    let port = random_port()?.to_string();
    let mut args = vec![
        "cakes-e2e-tests",
        "--port",
        &port,
        "--database-url",
        &database_url,
        "--create-table",
        "--shutdown-grace",
        "1s",
    ];
    args.extend_from_slice(extra_args);
    let config = ServerConfig::try_parse_from(args)?;
    Ok((config, guard))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &[])
}

/// Running test server, shutdown is signalled when dropped.
pub struct ServerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<cakes_server::Result<()>>>,
}

impl ServerHandle {
    /// Signals shutdown and waits until server finishes.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => Ok(task.await??),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_server(args: ServerConfig) -> Result<ServerHandle> {
    let base_url = args.base_url()?;
    let state = cakes_server::build_state(&args, time::UtcOffset::UTC).await?;
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(cakes_server::run_graceful_with_state(
        args,
        state,
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(ServerHandle {
                    shutdown: Some(shutdown),
                    task: Some(task),
                });
            }
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start at {base_url}"))
}

pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, Url, ServerHandle)> {
    let base_url = args.base_url()?;
    let server = spawn_server(args).await?;
    Ok((reqwest::Client::new(), base_url, server))
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url")
        .push(&segment.to_string());
    url
}

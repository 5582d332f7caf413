use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use cakes_app::{service::CakeService, state::AppState};
use cakes_dal::cake::CakeRepository;
use time::UtcOffset;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub async fn build_state(config: &ServerConfig, local_offset: UtcOffset) -> Result<AppState> {
    cakes_dal::check_table_name(&config.table_name)?;
    let pool = cakes_dal::new_pool(&config.database_url).await?;
    if config.create_table {
        cakes_dal::create_table(&pool, &config.table_name).await?;
    }
    let repository = CakeRepository::new(pool.clone(), &config.table_name).await?;
    let cakes = CakeService::new(repository, local_offset);
    Ok(AppState::new(pool, cakes))
}

pub async fn run(args: ServerConfig, local_offset: UtcOffset) -> Result<()> {
    let state = build_state(&args, local_offset).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    run_graceful_with_state(args, state, shutdown_signal()).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let pool = state.pool().clone();
    let mut app = main_router(state);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await;

    debug!("Closing database pool");
    if tokio::time::timeout(args.shutdown_grace, pool.close())
        .await
        .is_err()
    {
        warn!(
            "Database pool not closed within {}",
            humantime::format_duration(args.shutdown_grace)
        );
    }
    served?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(feature = "openapi")]
fn api_docs() -> utoipa::openapi::OpenApi {
    #[derive(utoipa::OpenApi)]
    #[openapi(info(title = "Cakes API"))]
    struct OpenApi;

    use utoipa::OpenApi as _;
    OpenApi::openapi().nest("/cakes", cakes_app::rest_api::cake::api_docs())
}

fn main_router(state: AppState) -> Router<()> {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/cakes", cakes_app::rest_api::cake::router())
        .with_state(state)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    #[cfg(feature = "openapi")]
    {
        let docs = api_docs();
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs),
        );
    }
    router
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(all(test, feature = "openapi"))]
mod tests {
    use super::*;

    #[test]
    fn test_api_docs_paths() {
        let docs = api_docs();
        let paths: Vec<_> = docs.paths.paths.keys().cloned().collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.starts_with("/cakes")));
        assert!(paths.iter().any(|p| p == "/cakes/{id}"));
    }
}

use clap::Parser;
use portkey_analytics::AnalyticsService;
use portkey_cache::{MokaRedirectCache, RedisRedirectCache};
use portkey_core::{LinkRepository, LogNotifier, RedirectCache, UserDirectory};
use portkey_gateway::{App, AppState, Cli};
use portkey_gateway::config::{CacheBackendArg, StorageBackendArg};
use portkey_redirector::RedirectorService;
use portkey_shortener::ShortenerService;
use portkey_sweeper::Sweeper;
use portkey_storage::{
    InMemoryRepository, InMemoryUserDirectory, MySqlRepository, MySqlUserDirectory,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Cli::try_parse()?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        "starting portkey gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            let repository = Arc::new(InMemoryRepository::new());
            let directory = Arc::new(InMemoryUserDirectory::new());
            run_with_cache(config, repository, directory).await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .clone()
                .ok_or_else(|| anyhow::anyhow!("mysql dsn is required for the mysql backend"))?;
            let repository = MySqlRepository::connect(&dsn).await?;
            repository.migrate().await?;
            let directory = Arc::new(MySqlUserDirectory::new(repository.pool().clone()));
            run_with_cache(config, Arc::new(repository), directory).await
        }
    }
}

async fn run_with_cache<R, D>(
    config: Cli,
    repository: Arc<R>,
    directory: Arc<D>,
) -> anyhow::Result<()>
where
    R: LinkRepository,
    D: UserDirectory,
{
    match config.cache {
        CacheBackendArg::InMemory => {
            let cache = Arc::new(MokaRedirectCache::new());
            run(config, repository, cache, directory).await
        }
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("redis url is required for the redis backend"))?;
            let client = redis::Client::open(url)?;
            let conn = client.get_multiplexed_async_connection().await?;
            let cache = Arc::new(RedisRedirectCache::new(conn));
            run(config, repository, cache, directory).await
        }
    }
}

async fn run<R, C, D>(
    config: Cli,
    repository: Arc<R>,
    cache: Arc<C>,
    directory: Arc<D>,
) -> anyhow::Result<()>
where
    R: LinkRepository,
    C: RedirectCache,
    D: UserDirectory,
{
    let ttls = config.cache_ttls();

    let shortener = Arc::new(ShortenerService::with_config(
        repository.clone(),
        cache.clone(),
        config.allocator(),
        ttls,
    ));
    let redirector = Arc::new(RedirectorService::with_ttls(
        repository.clone(),
        cache.clone(),
        ttls,
    ));
    let analytics = Arc::new(AnalyticsService::with_ttls(
        repository.clone(),
        cache.clone(),
        ttls,
    ));

    let sweeper = Sweeper::new(
        repository,
        cache,
        Arc::new(LogNotifier),
        directory.clone(),
        config.sweeper_config(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    let state = AppState::new(
        shortener,
        redirector,
        analytics,
        directory,
        config.public_base_url.clone(),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

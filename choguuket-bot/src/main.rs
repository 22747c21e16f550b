use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use choguuket_bot::{
    app,
    bridge::NotificationBridge,
    intake::Intake,
    state::{AppContext, AppState, Settings},
    telegram::{LongPoll, TelegramClient},
    worker::run_intake_loop,
};
use choguuket_core::repository::{SearchCache, TripStore};
use choguuket_store::app_config::{CacheBackend, Config, LoggingConfig, StoreBackend};
use choguuket_store::{Database, MemorySearchCache, MemoryTripStore, PgTripStore, RedisSearchCache};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "choguuket_bot=debug,choguuket_store=info,tower_http=debug";

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_deref().unwrap_or(DEFAULT_LOG_FILTER).into());
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load config")?;
    init_tracing(&config.logging);
    tracing::info!("Starting choguuket bot on port {}", config.server.port);

    // Store
    let mut database = None;
    let store: Arc<dyn TripStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            database = Some(db.clone());
            Arc::new(PgTripStore::new(db, config.database.search_window()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory trip store, nothing survives a restart");
            Arc::new(MemoryTripStore::new(config.database.search_window()))
        }
    };

    // Search cache
    let cache: Arc<dyn SearchCache> = match (config.cache.backend, config.cache.redis_url.as_ref()) {
        (CacheBackend::Redis, Some(url)) => {
            let redis = RedisSearchCache::new(url.expose()).context("Invalid Redis URL")?;
            redis.ping().await.context("Failed to connect to Redis")?;
            Arc::new(redis)
        }
        (CacheBackend::Redis, None) => anyhow::bail!("cache.backend is redis but cache.redis_url is not set"),
        (CacheBackend::Memory, _) => Arc::new(MemorySearchCache::new(config.cache.max_entries)),
    };

    if config.telegram.token.expose().is_empty() {
        anyhow::bail!("telegram.token is not set (CHOGUUKET__TELEGRAM__TOKEN)");
    }
    let telegram = TelegramClient::from_config(&config.telegram).context("Failed to build Telegram client")?;
    let ctx = Arc::new(AppContext::new(
        store,
        cache,
        Arc::new(telegram.clone()),
        Settings::from_config(&config),
    ));

    let shutdown = CancellationToken::new();

    let source = LongPoll::new(telegram, Duration::from_secs(config.telegram.poll_timeout_seconds));
    let intake_loop = tokio::spawn(run_intake_loop(
        source,
        Intake::new(ctx.clone()),
        config.intake.max_in_flight,
        shutdown.clone(),
    ));

    let app_state = AppState {
        bridge: Arc::new(NotificationBridge::new(ctx)),
        auth_token: config.http.auth_token.clone(),
    };
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tokio::spawn(watch_signals(shutdown.clone()));
    let stop = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await;
    // The server may also stop on its own error; the intake loop has to follow.
    shutdown.cancel();

    if let Err(e) = intake_loop.await {
        tracing::error!("Intake loop panicked: {}", e);
    }
    if let Some(db) = database {
        db.close().await;
    }
    served.context("HTTP server failed")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use trending_service::{
    config::{Config, LeaderboardBackend, NotifyTransport},
    error::AppError,
    logging,
    redis_client::RedisClient,
    routes,
    services::{
        event_queue, CounterStore, InMemoryCounterStore, InMemoryLeaderboard, LeaderboardStore,
        PgCounterStore, RankingUpdater, RedisLeaderboard,
    },
    state::AppState,
    websocket::{
        pubsub::start_pubsub_listener, ConnectionHub, LocalPublisher, NotificationPublisher,
        RedisPublisher,
    },
};

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let redis = if cfg.needs_redis() {
        Some(connect_redis(&cfg.redis_url).await?)
    } else {
        None
    };

    let counters: Arc<dyn CounterStore> = match &cfg.database_url {
        Some(url) => Arc::new(
            PgCounterStore::connect(url, cfg.db_max_connections)
                .await
                .map_err(|e| AppError::StartServer(format!("db: {e}")))?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, engagement counters are kept in memory");
            Arc::new(InMemoryCounterStore::new())
        }
    };

    let leaderboard: Arc<dyn LeaderboardStore> = match cfg.leaderboard_backend {
        LeaderboardBackend::Redis => Arc::new(RedisLeaderboard::new(
            require_redis(redis.as_ref())?.manager(),
            cfg.leaderboard_key.clone(),
        )),
        LeaderboardBackend::Memory => Arc::new(InMemoryLeaderboard::new()),
    };

    let hub = ConnectionHub::new();

    let publisher: Arc<dyn NotificationPublisher> = match cfg.notify_transport {
        NotifyTransport::Redis => {
            Arc::new(RedisPublisher::new(require_redis(redis.as_ref())?.manager()))
        }
        NotifyTransport::Local => Arc::new(LocalPublisher::new(hub.clone())),
    };

    let (queue, events) = event_queue::channel(cfg.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let updater = RankingUpdater::new(
        counters,
        leaderboard.clone(),
        publisher,
        cfg.notify_channel.clone(),
        cfg.top_n,
    );
    let updater_task: JoinHandle<()> = tokio::spawn(updater.run(events, shutdown_rx.clone()));

    // Every instance rebroadcasts what any instance publishes
    let bridge_task: Option<JoinHandle<()>> = match cfg.notify_transport {
        NotifyTransport::Redis => Some(tokio::spawn(start_pubsub_listener(
            require_redis(redis.as_ref())?.client(),
            cfg.notify_channel.clone(),
            hub.clone(),
            shutdown_rx.clone(),
        ))),
        NotifyTransport::Local => None,
    };

    let state = AppState {
        config: cfg.clone(),
        hub: hub.clone(),
        queue,
        leaderboard,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(
        %bind_addr,
        leaderboard = ?cfg.leaderboard_backend,
        transport = ?cfg.notify_transport,
        top_n = cfg.top_n,
        "starting trending-service"
    );

    let server = HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .disable_signals()
    .shutdown_timeout(cfg.shutdown_grace_secs)
    .bind(&bind_addr)
    .map_err(|e| AppError::StartServer(format!("bind: {e}")))?
    .run();

    let server_handle = server.handle();
    let signal_hub = hub.clone();
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");

        signal_tx.send_replace(true);
        server_handle.pause().await;
        let closed = signal_hub.close_all().await;
        tracing::info!(closed, "websocket connections closed");
        server_handle.stop(true).await;
    });

    let result = server
        .await
        .map_err(|e| AppError::StartServer(format!("http server: {e}")));

    // The server may also stop without a signal
    shutdown_tx.send_replace(true);
    let grace = cfg.shutdown_grace();
    if tokio::time::timeout(grace, updater_task).await.is_err() {
        tracing::warn!("ranking updater did not stop within the grace period");
    }
    if let Some(task) = bridge_task {
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::warn!("pub/sub bridge did not stop within the grace period");
        }
    }

    tracing::info!("trending-service stopped");
    result
}

async fn connect_redis(url: &str) -> Result<RedisClient, AppError> {
    let redis = tokio::time::timeout(REDIS_CONNECT_TIMEOUT, RedisClient::from_url(url))
        .await
        .map_err(|_| AppError::StartServer("redis: connection timed out".into()))?
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;

    redis
        .ping()
        .await
        .map_err(|e| AppError::StartServer(format!("redis ping: {e}")))?;

    tracing::info!("connected to redis");
    Ok(redis)
}

fn require_redis(redis: Option<&RedisClient>) -> Result<&RedisClient, AppError> {
    redis.ok_or_else(|| AppError::Config("redis backend selected without a connection".into()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

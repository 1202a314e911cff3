//! Squad Sheet Back binary entrypoint wiring the REST routes and the club store.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use squad_sheet_back::{
    config::AppConfig,
    dao::{
        cache::CachedClubStore,
        club_store::{ClubStore, memory::MemoryClubStore},
    },
    routes,
    state::{AppState, Clock, SharedState},
};

/// Default lifetime of cached reads when `CACHE_TTL_SECS` is unset.
const DEFAULT_CACHE_TTL_SECS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = build_state(config, cache_ttl());
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend: MongoDB when `MONGO_URI` is set, the seeded in-memory store otherwise.
fn build_state(config: AppConfig, cache_ttl: Option<Duration>) -> SharedState {
    #[cfg(feature = "mongo-store")]
    {
        if env::var("MONGO_URI").is_ok() {
            let players = config.seed_players().to_vec();
            let matches = config.seed_matches().to_vec();
            let state = AppState::new(config);
            tokio::spawn(squad_sheet_back::services::storage_supervisor::run(
                state.clone(),
                move || mongo::connect(players.clone(), matches.clone(), cache_ttl),
            ));
            return state;
        }
    }

    let store = MemoryClubStore::seeded(
        config.seed_players().to_vec(),
        config.seed_matches().to_vec(),
    );
    info!(
        players = config.seed_players().len(),
        matches = config.seed_matches().len(),
        "serving the in-memory club store"
    );
    AppState::with_store(config, with_cache(Arc::new(store), cache_ttl), Clock::System)
}

#[cfg(feature = "mongo-store")]
mod mongo {
    use std::{sync::Arc, time::Duration};

    use tracing::info;

    use squad_sheet_back::dao::{
        club_store::{
            ClubStore,
            mongodb::{MongoClubStore, MongoConfig},
        },
        models::{MatchEntity, PlayerEntity},
        storage::StorageError,
    };

    /// Open the MongoDB store, seed an empty database, and wrap it in the read cache.
    pub async fn connect(
        players: Vec<PlayerEntity>,
        matches: Vec<MatchEntity>,
        cache_ttl: Option<Duration>,
    ) -> Result<Arc<dyn ClubStore>, StorageError> {
        let config = MongoConfig::from_env().await?;
        let store = MongoClubStore::connect(config).await?;
        if store.seed_if_empty(players, matches).await? {
            info!("seeded an empty database with the configured roster and fixtures");
        }
        Ok(super::with_cache(Arc::new(store), cache_ttl))
    }
}

fn with_cache(store: Arc<dyn ClubStore>, ttl: Option<Duration>) -> Arc<dyn ClubStore> {
    match ttl {
        Some(ttl) => Arc::new(CachedClubStore::new(store, ttl)),
        None => store,
    }
}

/// `CACHE_TTL_SECS`, where `0` disables the cache.
fn cache_ttl() -> Option<Duration> {
    let seconds = match env::var("CACHE_TTL_SECS") {
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid CACHE_TTL_SECS; using the default");
            DEFAULT_CACHE_TTL_SECS
        }),
        Err(_) => DEFAULT_CACHE_TTL_SECS,
    };
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

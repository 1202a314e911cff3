/// Identity of the user behind a request.
pub mod actor;
/// Match sheet lifecycle and the gates it puts on ratings and statistics.
pub mod sheet_machine;

use std::{sync::Arc, time::SystemTime};

use time::{Date, OffsetDateTime};
use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::club_store::ClubStore, error::ServiceError};

pub type SharedState = Arc<AppState>;

/// Source of "today" for match-day checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Current UTC calendar day.
    System,
    /// Pinned calendar day, for tests and replays.
    Fixed(Date),
}

impl Clock {
    pub fn today(&self) -> Date {
        match self {
            Clock::System => OffsetDateTime::now_utc().date(),
            Clock::Fixed(day) => *day,
        }
    }
}

/// Central application state: storage handle, degraded flag, and configuration.
pub struct AppState {
    club_store: RwLock<Option<Arc<dyn ClubStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    clock: Clock,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::build(config, None, Clock::System)
    }

    /// State with a store already installed.
    pub fn with_store(config: AppConfig, store: Arc<dyn ClubStore>, clock: Clock) -> SharedState {
        Self::build(config, Some(store), clock)
    }

    fn build(config: AppConfig, store: Option<Arc<dyn ClubStore>>, clock: Clock) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(store.is_none());
        Arc::new(Self {
            club_store: RwLock::new(store),
            degraded: degraded_tx,
            config,
            clock,
        })
    }

    /// Obtain a handle to the current club store, if one is installed.
    pub async fn club_store(&self) -> Option<Arc<dyn ClubStore>> {
        let guard = self.club_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while storage is unhealthy.
    pub async fn require_store(&self) -> Result<Arc<dyn ClubStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.club_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new club store implementation and leave degraded mode.
    pub async fn install_club_store(&self, store: Arc<dyn ClubStore>) {
        {
            let mut guard = self.club_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current club store and enter degraded mode.
    pub async fn clear_club_store(&self) {
        {
            let mut guard = self.club_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Calendar day used to decide whether a match has been played.
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// Timestamp stamped on writes.
    pub fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

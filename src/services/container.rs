//! Service container for dependency injection.
//!
//! The ServiceContainer holds references to all application services and
//! manages their lifecycle.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::calendar::{CalendarProvider, InMemoryCalendar};
use crate::database::repositories::{ActionRepository, SqlxActionRepository};
use crate::media::{LogOnlyMediaController, MediaController};
use crate::notification::ExecutionEventBroadcaster;
use crate::scheduler::{ActionExecutor, HealthReporter, Scheduler};
use crate::Result;

/// Default event channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Read pool.
    pub pool: SqlitePool,
    /// Action repository.
    pub action_repository: Arc<dyn ActionRepository>,
    /// Calendar boundary.
    pub calendar: Arc<InMemoryCalendar>,
    /// Execution event broadcaster (shared between services).
    pub event_broadcaster: ExecutionEventBroadcaster,
    /// The scheduling engine.
    pub scheduler: Arc<Scheduler>,
    /// Health reporter over scheduler + store.
    pub health_reporter: Arc<HealthReporter>,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Create a new service container with the given pools, the log-only
    /// media controller, and an empty in-memory calendar.
    pub async fn new(
        pool: SqlitePool,
        write_pool: SqlitePool,
        default_tz: chrono_tz::Tz,
    ) -> Result<Self> {
        Self::with_media_controller(
            pool,
            write_pool,
            default_tz,
            Arc::new(LogOnlyMediaController),
        )
        .await
    }

    /// Create a new service container with a custom media controller.
    pub async fn with_media_controller(
        pool: SqlitePool,
        write_pool: SqlitePool,
        default_tz: chrono_tz::Tz,
        media: Arc<dyn MediaController>,
    ) -> Result<Self> {
        info!("Initializing service container");

        let action_repository: Arc<dyn ActionRepository> = Arc::new(SqlxActionRepository::new(
            pool.clone(),
            write_pool,
            default_tz,
        ));

        let calendar = Arc::new(InMemoryCalendar::new());
        let calendar_provider: Arc<dyn CalendarProvider> = calendar.clone();

        let event_broadcaster = ExecutionEventBroadcaster::with_capacity(DEFAULT_EVENT_CAPACITY);

        let executor = Arc::new(ActionExecutor::new(
            action_repository.clone(),
            media,
            calendar_provider,
            event_broadcaster.clone(),
        ));

        let cancellation_token = CancellationToken::new();

        let scheduler = Arc::new(Scheduler::new(
            action_repository.clone(),
            executor,
            default_tz,
            cancellation_token.child_token(),
        ));

        let health_reporter = Arc::new(HealthReporter::new(
            scheduler.clone(),
            action_repository.clone(),
        ));

        info!("Service container initialized");

        Ok(Self {
            pool,
            action_repository,
            calendar,
            event_broadcaster,
            scheduler,
            health_reporter,
            cancellation_token,
        })
    }

    /// Initialize all services: run the scheduler's initial reconciliation.
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing services");
        let summary = self.scheduler.start().await?;
        info!(
            armed = summary.armed(),
            skipped_past = summary.skipped_past,
            skipped_inactive = summary.skipped_inactive,
            "Scheduler hydrated from store"
        );
        Ok(())
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Shut down all services.
    pub async fn shutdown(&self) {
        info!("Shutting down services");
        self.scheduler.stop();
        self.cancellation_token.cancel();
        self.pool.close().await;
        info!("Services shut down");
    }
}

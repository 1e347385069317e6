//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::context::{Clock, Context, IdProvider};
use crate::database::IncidentRepository;
use crate::error::Result;
use crate::services::{
    ActionLog, AlertSimulator, ChatService, DraftQueue, ExportService, IncidentsService,
    NotificationCenter, Scheduler, SettingsService, TokioScheduler, UsersService,
};
use crate::storage::{seed_fixtures, SqliteStore, Store};
use std::path::Path;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub ctx: Context,
    pub scheduler: Arc<dyn Scheduler>,
    pub repo: IncidentRepository,
    pub drafts: DraftQueue,
    pub actions: ActionLog,
    pub notifications: NotificationCenter,
    pub settings: SettingsService,
    pub users: UsersService,
    pub chat: ChatService,
    pub export: ExportService,
    pub incidents: IncidentsService,
    pub alerts: AlertSimulator,
}

impl AppState {
    /// Seed first-run data if needed and wire every service
    pub async fn initialize(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        tracing::info!("Initializing application");

        let ctx = Context::new(store, clock, ids);
        if seed_fixtures(&ctx).await? {
            tracing::info!("Fixture data written");
        }

        let repo = IncidentRepository::new(ctx.clone());
        let drafts = DraftQueue::new(ctx.clone());
        let actions = ActionLog::new(ctx.clone());
        let notifications = NotificationCenter::new(ctx.clone(), actions.clone(), scheduler.clone());
        let settings = SettingsService::new(ctx.clone(), actions.clone());
        let users = UsersService::new(
            ctx.clone(),
            settings.clone(),
            notifications.clone(),
            actions.clone(),
        );
        let chat = ChatService::new(ctx.clone(), actions.clone());
        let export = ExportService::new(repo.clone(), notifications.clone(), actions.clone());
        let incidents = IncidentsService::new(
            repo.clone(),
            drafts.clone(),
            settings.clone(),
            notifications.clone(),
            actions.clone(),
        );
        let alerts = AlertSimulator::new(notifications.clone(), scheduler.clone());

        tracing::info!("Application initialized successfully");

        Ok(Self {
            ctx,
            scheduler,
            repo,
            drafts,
            actions,
            notifications,
            settings,
            users,
            chat,
            export,
            incidents,
            alerts,
        })
    }

    /// Wall clock, random ids and tokio timers. Must run inside a tokio runtime.
    pub async fn system(store: Arc<dyn Store>) -> Result<Self> {
        let ctx = Context::system(store);
        Self::initialize(ctx.store, ctx.clock, ctx.ids, Arc::new(TokioScheduler::new())).await
    }

    /// Open (or create) the SQLite database at `db_path` and start from it
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("Database path: {:?}", db_path);
        let store = SqliteStore::open(db_path).await?;
        Self::system(Arc::new(store)).await
    }

    /// Stop the alert simulator and cancel every pending timer
    pub fn shutdown(&self) {
        self.alerts.stop();
        self.notifications.cancel_pending();
        self.scheduler.shutdown();
        tracing::info!("Application shut down");
    }
}

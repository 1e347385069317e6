//! Alert simulator
//!
//! Pushes a simulated road alert through the notification center on a
//! fixed interval until stopped.

use crate::config::{SIMULATED_ALERTS, SIMULATED_ALERT_INTERVAL_SECS};
use crate::database::{Level, Notification};
use crate::error::Result;
use crate::services::notifications::NotificationCenter;
use crate::services::scheduler::{Scheduler, TaskFuture, TaskHandle};
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct AlertSimulator {
    notifications: NotificationCenter,
    scheduler: Arc<dyn Scheduler>,
    current_job: Arc<Mutex<Option<TaskHandle>>>,
}

impl AlertSimulator {
    pub fn new(notifications: NotificationCenter, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            notifications,
            scheduler,
            current_job: Arc::new(Mutex::new(None)),
        }
    }

    /// Push one randomly chosen alert
    pub async fn emit_once(&self) -> Result<Notification> {
        let text = SIMULATED_ALERTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Nuevo reporte de derrumbe");
        self.notifications.notify(text, Level::Info).await
    }

    /// Start periodic alerts, replacing any running schedule
    pub fn start(&self) {
        self.stop();

        let simulator = self.clone();
        let handle = self.scheduler.schedule_every(
            Duration::from_secs(SIMULATED_ALERT_INTERVAL_SECS),
            Arc::new(move || -> TaskFuture {
                let simulator = simulator.clone();
                Box::pin(async move {
                    if let Err(e) = simulator.emit_once().await {
                        tracing::error!("Simulated alert failed: {}", e);
                    }
                })
            }),
        );

        if let Ok(mut current) = self.current_job.lock() {
            *current = Some(handle);
        }
        tracing::info!(
            "Alert simulator started, every {}s",
            SIMULATED_ALERT_INTERVAL_SECS
        );
    }

    /// Stop periodic alerts
    pub fn stop(&self) {
        let previous = self.current_job.lock().ok().and_then(|mut c| c.take());
        if let Some(handle) = previous {
            handle.cancel();
            tracing::info!("Alert simulator stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.current_job
            .lock()
            .map(|c| c.as_ref().is_some_and(|h| !h.is_cancelled()))
            .unwrap_or(false)
    }
}

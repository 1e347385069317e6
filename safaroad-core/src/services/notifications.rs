//! Notification center
//!
//! Keeps a bounded, persisted history of alerts and publishes transient
//! display events for the presentation layer. Two independent timers run
//! per auto-hiding notification: the toast hides after a short delay and
//! the history entry is removed after a longer one.

use crate::config::{KEY_NOTIFICATIONS, NOTIFICATION_AUTO_REMOVE_MS, NOTIFICATION_HISTORY_CAP, TOAST_HIDE_MS};
use crate::context::Context;
use crate::database::{Level, Notification};
use crate::error::Result;
use crate::services::actions::ActionLog;
use crate::services::scheduler::{Scheduler, TaskHandle};
use crate::storage::load;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

const DISPLAY_CHANNEL_CAPACITY: usize = 64;

/// Transient display instructions for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// Show a toast for this notification
    Show(Notification),
    /// Hide the toast of the notification with this id
    Hide(String),
}

#[derive(Clone)]
pub struct NotificationCenter {
    ctx: Context,
    actions: ActionLog,
    scheduler: Arc<dyn Scheduler>,
    events: broadcast::Sender<DisplayEvent>,
    pending_removals: Arc<Mutex<HashMap<String, TaskHandle>>>,
}

impl NotificationCenter {
    pub fn new(ctx: Context, actions: ActionLog, scheduler: Arc<dyn Scheduler>) -> Self {
        let (events, _) = broadcast::channel(DISPLAY_CHANNEL_CAPACITY);
        Self {
            ctx,
            actions,
            scheduler,
            events,
            pending_removals: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Receive display events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    /// Persisted history, newest first
    pub async fn history(&self) -> Vec<Notification> {
        load(self.ctx.store.as_ref(), KEY_NOTIFICATIONS).await
    }

    /// Push an auto-hiding notification
    pub async fn notify(&self, text: impl Into<String>, level: Level) -> Result<Notification> {
        self.push(text, level, true).await
    }

    /// Create a notification, record it in history and display it.
    ///
    /// History keeps the most recent entries only; older ones are dropped.
    /// `error` and `success` notifications are echoed into the action log.
    pub async fn push(
        &self,
        text: impl Into<String>,
        level: Level,
        auto_hide: bool,
    ) -> Result<Notification> {
        let notification = Notification {
            id: self.ctx.next_id(),
            text: text.into(),
            level,
            ts: self.ctx.now_ms(),
        };

        let evicted = self
            .ctx
            .update(KEY_NOTIFICATIONS, |history: &mut Vec<Notification>| {
                history.insert(0, notification.clone());
                let evicted: Vec<String> = history
                    .iter()
                    .skip(NOTIFICATION_HISTORY_CAP)
                    .map(|n| n.id.clone())
                    .collect();
                history.truncate(NOTIFICATION_HISTORY_CAP);
                Ok(evicted)
            })
            .await?;
        for id in &evicted {
            self.cancel_removal(id);
        }

        tracing::debug!("Notification {:?}: {}", level, notification.text);

        // No subscribers is fine: nothing is displaying right now.
        let _ = self.events.send(DisplayEvent::Show(notification.clone()));

        if auto_hide {
            self.schedule_toast_hide(&notification.id);
            self.schedule_removal(&notification.id);
        }

        if level.is_audited() {
            self.actions.append_notification_echo(&notification.text).await?;
        }

        Ok(notification)
    }

    fn schedule_toast_hide(&self, id: &str) {
        let events = self.events.clone();
        let id = id.to_string();
        self.scheduler.schedule_after(
            Duration::from_millis(TOAST_HIDE_MS),
            Box::pin(async move {
                let _ = events.send(DisplayEvent::Hide(id));
            }),
        );
    }

    fn schedule_removal(&self, id: &str) {
        let center = self.clone();
        let task_id = id.to_string();
        let handle = self.scheduler.schedule_after(
            Duration::from_millis(NOTIFICATION_AUTO_REMOVE_MS),
            Box::pin(async move {
                if let Err(e) = center.dismiss(&task_id).await {
                    tracing::warn!("Failed to expire notification {}: {}", task_id, e);
                }
            }),
        );

        if let Ok(mut pending) = self.pending_removals.lock() {
            pending.insert(id.to_string(), handle);
        }
    }

    /// Remove a notification from history. Returns whether it was present.
    ///
    /// Dismissing twice, or after the automatic removal already ran, is a no-op.
    pub async fn dismiss(&self, id: &str) -> Result<bool> {
        self.cancel_removal(id);

        let removed = self
            .ctx
            .update(KEY_NOTIFICATIONS, |history: &mut Vec<Notification>| {
                let before = history.len();
                history.retain(|n| n.id != id);
                Ok(history.len() != before)
            })
            .await?;

        if removed {
            tracing::debug!("Dismissed notification: {}", id);
        }
        Ok(removed)
    }

    /// Cancel every pending history removal. Entries stay in history.
    pub fn cancel_pending(&self) {
        let handles: Vec<TaskHandle> = match self.pending_removals.lock() {
            Ok(mut pending) => pending.drain().map(|(_, handle)| handle).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, handle)| handle).collect(),
        };
        for handle in &handles {
            handle.cancel();
        }
        tracing::debug!("Cancelled {} pending notification removal(s)", handles.len());
    }

    /// Number of notifications waiting for automatic removal
    pub fn pending_removal_count(&self) -> usize {
        self.pending_removals.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn cancel_removal(&self, id: &str) {
        let handle = self
            .pending_removals
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(id));
        if let Some(handle) = handle {
            handle.cancel();
        }
    }
}

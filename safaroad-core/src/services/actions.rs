//! Action log service
//!
//! Bounded audit trail of user-initiated operations, newest first.

use crate::config::{ACTION_LOG_CAP, KEY_ACTIONS, NOTIFICATION_ECHO_PREFIX};
use crate::context::Context;
use crate::database::ActionLogEntry;
use crate::error::Result;
use crate::storage::load;

#[derive(Clone)]
pub struct ActionLog {
    ctx: Context,
}

impl ActionLog {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Record an action, keeping only the most recent entries
    pub async fn append(&self, action: impl Into<String>) -> Result<ActionLogEntry> {
        let entry = ActionLogEntry {
            id: self.ctx.next_id(),
            action: action.into(),
            ts: self.ctx.now_ms(),
        };

        self.ctx
            .update(KEY_ACTIONS, |entries: &mut Vec<ActionLogEntry>| {
                entries.insert(0, entry.clone());
                entries.truncate(ACTION_LOG_CAP);
                Ok(())
            })
            .await?;

        tracing::debug!("Logged action: {}", entry.action);
        Ok(entry)
    }

    /// Record that a notification was shown
    pub(crate) async fn append_notification_echo(&self, text: &str) -> Result<ActionLogEntry> {
        self.append(format!("{} {}", NOTIFICATION_ECHO_PREFIX, text)).await
    }

    /// Entries newest first, optionally without notification echoes
    pub async fn list(&self, exclude_notification_echo: bool) -> Vec<ActionLogEntry> {
        let entries: Vec<ActionLogEntry> = load(self.ctx.store.as_ref(), KEY_ACTIONS).await;
        if !exclude_notification_echo {
            return entries;
        }

        entries
            .into_iter()
            .filter(|e| !is_notification_echo(&e.action))
            .collect()
    }

    /// User-initiated actions only
    pub async fn visible(&self) -> Vec<ActionLogEntry> {
        self.list(true).await
    }
}

fn is_notification_echo(action: &str) -> bool {
    action.starts_with(NOTIFICATION_ECHO_PREFIX)
}

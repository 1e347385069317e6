//! Settings service
//!
//! Session and preference state persisted under the settings key.

use crate::config::KEY_SETTINGS;
use crate::context::Context;
use crate::database::Role;
use crate::error::Result;
use crate::services::actions::ActionLog;
use crate::storage::load;
use serde::{Deserialize, Serialize};

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    /// While set, reports are queued as drafts instead of submitted
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub current_role: Role,
    #[serde(default)]
    pub theme: Theme,
    /// Whether the recent actions panel is collapsed
    #[serde(default)]
    pub actions_collapsed: bool,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    ctx: Context,
    actions: ActionLog,
}

impl SettingsService {
    pub fn new(ctx: Context, actions: ActionLog) -> Self {
        Self { ctx, actions }
    }

    /// Load settings, defaults when nothing was saved yet
    pub async fn load(&self) -> AppSettings {
        load(self.ctx.store.as_ref(), KEY_SETTINGS).await
    }

    /// Save settings
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        self.modify(|current| *current = settings.clone()).await?;
        tracing::debug!("Settings saved");
        Ok(())
    }

    async fn modify<R>(&self, change: impl FnOnce(&mut AppSettings) -> R) -> Result<R> {
        self.ctx
            .update(KEY_SETTINGS, |settings: &mut AppSettings| Ok(change(settings)))
            .await
    }

    pub async fn is_offline(&self) -> bool {
        self.load().await.offline
    }

    pub async fn set_offline(&self, offline: bool) -> Result<()> {
        self.modify(|settings| settings.offline = offline).await
    }

    /// Record the signed-in user, or clear the session with `None`
    pub async fn set_session(&self, user: Option<(String, Role)>) -> Result<()> {
        match &user {
            Some((username, _)) => tracing::info!("Session started for {}", username),
            None => tracing::info!("Session cleared"),
        }

        self.modify(|settings| match user {
            Some((username, role)) => {
                settings.current_user = Some(username);
                settings.current_role = role;
            }
            None => {
                settings.current_user = None;
                settings.current_role = Role::default();
            }
        })
        .await
    }

    pub async fn current_user(&self) -> Option<String> {
        self.load().await.current_user
    }

    /// Switch between light and dark theme
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let theme = self
            .modify(|settings| {
                settings.theme = settings.theme.toggled();
                settings.theme
            })
            .await?;
        self.actions.append("Cambio de tema").await?;
        Ok(theme)
    }

    pub async fn set_actions_collapsed(&self, collapsed: bool) -> Result<()> {
        self.modify(|settings| settings.actions_collapsed = collapsed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ManualClock, SequentialIds};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn create_test_service() -> (SettingsService, ActionLog) {
        let ctx = Context::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
            Arc::new(SequentialIds::new()),
        );
        let actions = ActionLog::new(ctx.clone());
        (SettingsService::new(ctx, actions.clone()), actions)
    }

    #[tokio::test]
    async fn test_defaults_when_unsaved() {
        let (service, _actions) = create_test_service();

        let settings = service.load().await;
        assert!(!settings.offline);
        assert_eq!(settings.current_user, None);
        assert_eq!(settings.current_role, Role::Usuario);
        assert_eq!(settings.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_offline_flag_persists() {
        let (service, _actions) = create_test_service();

        service.set_offline(true).await.unwrap();
        assert!(service.is_offline().await);

        service.set_offline(false).await.unwrap();
        assert!(!service.is_offline().await);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (service, _actions) = create_test_service();

        service
            .set_session(Some(("admin".to_string(), Role::Admin)))
            .await
            .unwrap();
        let settings = service.load().await;
        assert_eq!(settings.current_user.as_deref(), Some("admin"));
        assert_eq!(settings.current_role, Role::Admin);

        service.set_session(None).await.unwrap();
        assert_eq!(service.current_user().await, None);
        assert_eq!(service.load().await.current_role, Role::Usuario);
    }

    #[tokio::test]
    async fn test_toggle_theme_logs_action() {
        let (service, actions) = create_test_service();

        assert_eq!(service.toggle_theme().await.unwrap(), Theme::Dark);
        assert_eq!(service.toggle_theme().await.unwrap(), Theme::Light);

        let entries = actions.visible().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "Cambio de tema");
    }

    #[tokio::test]
    async fn test_other_fields_preserved_on_update() {
        let (service, _actions) = create_test_service();

        service.set_actions_collapsed(true).await.unwrap();
        service.set_offline(true).await.unwrap();

        let settings = service.load().await;
        assert!(settings.actions_collapsed);
        assert!(settings.offline);
    }
}

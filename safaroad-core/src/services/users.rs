//! Users service
//!
//! Local user directory. Passwords are compared in plain text; this is only
//! acceptable for a trusted single-user local context.

use crate::config::KEY_USERS;
use crate::context::Context;
use crate::database::{Level, Role, User};
use crate::error::{AppError, Result};
use crate::services::actions::ActionLog;
use crate::services::notifications::NotificationCenter;
use crate::services::settings::SettingsService;
use crate::storage::load;

#[derive(Clone)]
pub struct UsersService {
    ctx: Context,
    settings: SettingsService,
    notifications: NotificationCenter,
    actions: ActionLog,
}

impl UsersService {
    pub fn new(
        ctx: Context,
        settings: SettingsService,
        notifications: NotificationCenter,
        actions: ActionLog,
    ) -> Self {
        Self {
            ctx,
            settings,
            notifications,
            actions,
        }
    }

    pub async fn list(&self) -> Vec<User> {
        load(self.ctx.store.as_ref(), KEY_USERS).await
    }

    pub async fn find(&self, username: &str) -> Option<User> {
        self.list().await.into_iter().find(|u| u.username == username)
    }

    /// Add a user. Usernames are unique.
    pub async fn register(&self, user: User) -> Result<User> {
        self.ctx
            .update(KEY_USERS, |users: &mut Vec<User>| {
                if users.iter().any(|u| u.username == user.username) {
                    return Err(AppError::UserExists(user.username.clone()));
                }
                users.push(user.clone());
                Ok(())
            })
            .await?;

        tracing::info!("Registered user: {}", user.username);
        Ok(user)
    }

    /// Check credentials and start a session on success
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = match self.find(username).await {
            Some(user) if user.password == password => user,
            _ => {
                tracing::info!("Rejected sign-in for {}", username);
                return Ok(None);
            }
        };

        self.settings
            .set_session(Some((user.username.clone(), user.role)))
            .await?;
        Ok(Some(user))
    }

    pub async fn logout(&self) -> Result<()> {
        self.settings.set_session(None).await
    }

    /// Update email and role of an existing user
    pub async fn update_profile(
        &self,
        username: &str,
        email: Option<String>,
        role: Role,
    ) -> Result<User> {
        let updated = self
            .ctx
            .update(KEY_USERS, |users: &mut Vec<User>| {
                let user = users
                    .iter_mut()
                    .find(|u| u.username == username)
                    .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;
                user.email = email.filter(|e| !e.is_empty());
                user.role = role;
                Ok(user.clone())
            })
            .await?;

        self.notifications
            .notify("Perfil actualizado", Level::Success)
            .await?;
        self.actions.append("Actualizó perfil").await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ManualClock, SequentialIds};
    use crate::services::scheduler::ManualScheduler;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn create_test_service() -> (UsersService, SettingsService, ActionLog) {
        let clock = Arc::new(ManualClock::new(0));
        let ctx = Context::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            Arc::new(SequentialIds::new()),
        );
        let actions = ActionLog::new(ctx.clone());
        let notifications = NotificationCenter::new(
            ctx.clone(),
            actions.clone(),
            Arc::new(ManualScheduler::new(clock)),
        );
        let settings = SettingsService::new(ctx.clone(), actions.clone());
        let service = UsersService::new(ctx, settings.clone(), notifications, actions.clone());
        (service, settings, actions)
    }

    fn user(name: &str, password: &str) -> User {
        User {
            username: name.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let (service, _settings, _actions) = create_test_service();

        service.register(user("ana", "x")).await.unwrap();
        let err = service.register(user("ana", "y")).await.unwrap_err();
        assert!(matches!(err, AppError::UserExists(name) if name == "ana"));
        assert_eq!(service.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_sets_session() {
        let (service, settings, _actions) = create_test_service();

        service.register(user("ana", "secreto")).await.unwrap();

        assert!(service.authenticate("ana", "nope").await.unwrap().is_none());
        assert!(service.authenticate("nadie", "secreto").await.unwrap().is_none());
        assert_eq!(settings.current_user().await, None);

        let signed_in = service.authenticate("ana", "secreto").await.unwrap().unwrap();
        assert_eq!(signed_in.username, "ana");
        assert_eq!(settings.current_user().await.as_deref(), Some("ana"));

        service.logout().await.unwrap();
        assert_eq!(settings.current_user().await, None);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (service, _settings, actions) = create_test_service();

        service.register(user("ana", "x")).await.unwrap();
        let updated = service
            .update_profile("ana", Some("ana@example.com".into()), Role::Admin)
            .await
            .unwrap();

        assert_eq!(updated.email.as_deref(), Some("ana@example.com"));
        assert_eq!(service.find("ana").await.unwrap().role, Role::Admin);

        let visible: Vec<String> = actions.visible().await.into_iter().map(|e| e.action).collect();
        assert_eq!(visible, vec!["Actualizó perfil"]);
    }

    #[tokio::test]
    async fn test_update_profile_unknown_user() {
        let (service, _settings, _actions) = create_test_service();

        let err = service
            .update_profile("nadie", None, Role::Usuario)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }
}

//! Incident commands
//!
//! User-facing incident operations. Each command performs its storage
//! mutation and then reports back through notifications and the action log.

use crate::config::{ANONYMOUS_REPORTER, GUEST_COMMENTER};
use crate::database::{
    Draft, Incident, IncidentPatch, IncidentQuery, IncidentRepository, Level, Severity,
};
use crate::error::Result;
use crate::services::actions::ActionLog;
use crate::services::drafts::DraftQueue;
use crate::services::notifications::NotificationCenter;
use crate::services::settings::SettingsService;
use std::collections::BTreeMap;

/// Fields collected by the report form
#[derive(Debug, Clone, Default)]
pub struct ReportSubmission {
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Where a submitted report ended up
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Submitted(Incident),
    /// Offline mode: kept in the draft queue until the next sync
    Queued(Draft),
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone)]
pub struct IncidentsService {
    repo: IncidentRepository,
    drafts: DraftQueue,
    settings: SettingsService,
    notifications: NotificationCenter,
    actions: ActionLog,
}

impl IncidentsService {
    pub fn new(
        repo: IncidentRepository,
        drafts: DraftQueue,
        settings: SettingsService,
        notifications: NotificationCenter,
        actions: ActionLog,
    ) -> Self {
        Self {
            repo,
            drafts,
            settings,
            notifications,
            actions,
        }
    }

    async fn build(&self, submission: ReportSubmission, title: String) -> Incident {
        let user = self
            .settings
            .current_user()
            .await
            .unwrap_or_else(|| ANONYMOUS_REPORTER.to_string());

        Incident {
            kind: submission.kind,
            severity: submission.severity,
            title,
            description: submission.description,
            lat: submission.lat,
            lng: submission.lng,
            image: submission.image,
            audio: submission.audio,
            user,
            ..Default::default()
        }
    }

    /// Submit a report, or queue it as a draft while offline
    pub async fn report(&self, submission: ReportSubmission) -> Result<ReportOutcome> {
        let title = format!("{} reportado", capitalize(&submission.kind));
        let incident = self.build(submission, title).await;

        if self.settings.is_offline().await {
            let draft = self.drafts.save(incident).await?;
            self.notifications
                .notify("Guardado localmente (offline)", Level::Warning)
                .await?;
            return Ok(ReportOutcome::Queued(draft));
        }

        let created = self.repo.create(incident).await?;
        self.notifications
            .notify("Reporte enviado con éxito", Level::Success)
            .await?;
        self.actions.append("Envió nuevo reporte").await?;

        tracing::info!("Incident reported: {}", created.id);
        Ok(ReportOutcome::Submitted(created))
    }

    /// Queue a report as a draft regardless of connectivity
    pub async fn save_draft(&self, submission: ReportSubmission) -> Result<Draft> {
        let title = format!("{} (Borrador)", capitalize(&submission.kind));
        let draft = self.build(submission, title).await;

        let draft = self.drafts.save(draft).await?;
        self.notifications
            .notify("Borrador guardado", Level::Info)
            .await?;
        self.actions.append("Guardó borrador").await?;
        Ok(draft)
    }

    pub async fn list(&self, query: &IncidentQuery) -> Vec<Incident> {
        self.repo.list(query).await
    }

    pub async fn drafts(&self) -> Vec<Draft> {
        self.drafts.list().await
    }

    /// Replace title and/or description; `None` keeps the current value
    pub async fn edit(
        &self,
        id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Incident> {
        let patch = IncidentPatch {
            title,
            description,
            ..Default::default()
        };
        let updated = self.repo.update(id, patch).await?;
        self.actions
            .append(format!("Editó incidente: {}", updated.title))
            .await?;
        Ok(updated)
    }

    /// Comment as the signed-in user. Empty text is ignored.
    pub async fn comment(&self, id: &str, text: &str) -> Result<Option<Incident>> {
        if text.is_empty() {
            return Ok(None);
        }

        let user = self
            .settings
            .current_user()
            .await
            .unwrap_or_else(|| GUEST_COMMENTER.to_string());

        let updated = self.repo.add_comment(id, &user, text).await?;
        self.actions
            .append(format!("Comentó en incidente: {}", updated.title))
            .await?;
        Ok(Some(updated))
    }

    async fn warn_empty_selection(&self) -> Result<usize> {
        self.notifications
            .notify("Seleccione al menos uno", Level::Warning)
            .await?;
        Ok(0)
    }

    /// Mark the selected incidents resolved. Returns how many matched.
    pub async fn resolve_selected(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return self.warn_empty_selection().await;
        }

        let affected = self.repo.set_resolved(ids, true).await?;
        self.notifications
            .notify("Marcado como resuelto", Level::Success)
            .await?;
        self.actions.append("Marcó como resueltos").await?;
        Ok(affected)
    }

    /// Delete the selected incidents. Returns how many were removed.
    pub async fn delete_selected(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return self.warn_empty_selection().await;
        }

        let removed = self.repo.delete(ids).await?;
        self.notifications.notify("Eliminado", Level::Info).await?;
        self.actions.append("Eliminó incidentes").await?;
        Ok(removed)
    }

    /// Switch offline mode. Going online syncs queued drafts.
    pub async fn set_offline(&self, offline: bool) -> Result<Vec<Incident>> {
        self.settings.set_offline(offline).await?;

        let state = if offline { "activo" } else { "desactivado" };
        self.notifications
            .notify(format!("Modo offline: {}", state), Level::Info)
            .await?;
        self.actions.append("Cambiado modo offline").await?;

        if offline {
            return Ok(Vec::new());
        }
        self.sync_drafts().await
    }

    /// Move queued drafts into the incident collection
    pub async fn sync_drafts(&self) -> Result<Vec<Incident>> {
        let synced = self.drafts.sync_all(&self.repo).await?;
        if !synced.is_empty() {
            self.notifications
                .notify("Borradores sincronizados", Level::Success)
                .await?;
            self.actions.append("Sincronizó borradores").await?;
        }
        Ok(synced)
    }

    /// Incident count per type
    pub async fn statistics(&self) -> BTreeMap<String, usize> {
        self.repo.count_by_type().await
    }
}

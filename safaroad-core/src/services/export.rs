//! Export service
//!
//! Serializes incidents to JSON and CSV text for the presentation layer to
//! hand over as downloads.

use crate::database::{Incident, IncidentRepository, Level, Severity};
use crate::error::{AppError, Result};
use crate::services::actions::ActionLog;
use crate::services::notifications::NotificationCenter;
use serde::Serialize;

/// Full export of the incident collection
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub json: String,
    /// Empty when there were no incidents
    pub csv: String,
}

/// Flat CSV projection of an incident; comments are reduced to a count
#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    severity: Severity,
    title: &'a str,
    description: &'a str,
    lat: Option<f64>,
    lng: Option<f64>,
    date: i64,
    image: Option<&'a str>,
    audio: Option<&'a str>,
    user: &'a str,
    comments: usize,
    resolved: bool,
}

impl<'a> From<&'a Incident> for CsvRow<'a> {
    fn from(i: &'a Incident) -> Self {
        Self {
            id: &i.id,
            kind: &i.kind,
            severity: i.severity,
            title: &i.title,
            description: &i.description,
            lat: i.lat,
            lng: i.lng,
            date: i.date,
            image: i.image.as_deref(),
            audio: i.audio.as_deref(),
            user: &i.user,
            comments: i.comments.len(),
            resolved: i.resolved,
        }
    }
}

fn to_csv(incidents: &[Incident]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for incident in incidents {
        writer.serialize(CsvRow::from(incident))?;
    }
    let bytes = writer.into_inner().map_err(|e| AppError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Generic(format!("CSV is not UTF-8: {}", e)))
}

#[derive(Clone)]
pub struct ExportService {
    repo: IncidentRepository,
    notifications: NotificationCenter,
    actions: ActionLog,
}

impl ExportService {
    pub fn new(repo: IncidentRepository, notifications: NotificationCenter, actions: ActionLog) -> Self {
        Self {
            repo,
            notifications,
            actions,
        }
    }

    /// Pretty JSON of a single incident
    pub async fn export_incident(&self, id: &str) -> Result<String> {
        let incident = match self.repo.export_one(id).await {
            Ok(incident) => incident,
            Err(e) => {
                if e.is_not_found() {
                    self.notifications
                        .notify("Incidente no encontrado", Level::Error)
                        .await?;
                }
                return Err(e);
            }
        };

        let json = serde_json::to_string_pretty(&incident)?;
        self.actions
            .append(format!("Exportó incidente {}", incident.title))
            .await?;
        Ok(json)
    }

    /// JSON and CSV of every incident
    pub async fn export_all(&self) -> Result<ExportBundle> {
        let incidents = self.repo.all().await;
        let json = serde_json::to_string_pretty(&incidents)?;

        let csv = if incidents.is_empty() {
            self.notifications
                .notify("No hay datos para exportar", Level::Warning)
                .await?;
            String::new()
        } else {
            to_csv(&incidents)?
        };

        self.notifications
            .notify("Exportado JSON y CSV", Level::Success)
            .await?;
        self.actions.append("Exportó datos").await?;

        tracing::info!("Exported {} incident(s)", incidents.len());
        Ok(ExportBundle { json, csv })
    }
}

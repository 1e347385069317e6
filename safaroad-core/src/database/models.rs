//! Entity models
//!
//! Rust structs representing persisted entities.
//! All models use serde for serialization; every field falls back to its
//! default when missing so older or hand-edited payloads still decode.

use serde::{Deserialize, Serialize};

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Prioritario,
}

/// A comment attached to an incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Comment {
    pub user: String,
    pub text: String,
    pub ts: i64,
}

/// A reported road hazard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Incident {
    pub id: String,
    /// Hazard category tag, e.g. "huayco" or "derrumbe"
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub date: i64,
    /// Opaque media reference (data URI, blob handle or path)
    pub image: Option<String>,
    pub audio: Option<String>,
    pub user: String,
    pub comments: Vec<Comment>,
    pub resolved: bool,
}

/// An incident waiting in the offline queue
pub type Draft = Incident;

/// Partial update applied by the repository
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentPatch {
    pub kind: Option<String>,
    pub severity: Option<Severity>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub resolved: Option<bool>,
}

impl IncidentPatch {
    pub(crate) fn apply(self, incident: &mut Incident) {
        if let Some(kind) = self.kind {
            incident.kind = kind;
        }
        if let Some(severity) = self.severity {
            incident.severity = severity;
        }
        if let Some(title) = self.title {
            incident.title = title;
        }
        if let Some(description) = self.description {
            incident.description = description;
        }
        if self.lat.is_some() {
            incident.lat = self.lat;
        }
        if self.lng.is_some() {
            incident.lng = self.lng;
        }
        if self.image.is_some() {
            incident.image = self.image;
        }
        if self.audio.is_some() {
            incident.audio = self.audio;
        }
        if let Some(resolved) = self.resolved {
            incident.resolved = resolved;
        }
    }
}

/// Notification level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl Level {
    /// Levels significant enough to be echoed into the action log
    pub fn is_audited(self) -> bool {
        matches!(self, Level::Error | Level::Success)
    }
}

/// A user-visible alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Notification {
    pub id: String,
    pub text: String,
    pub level: Level,
    pub ts: i64,
}

/// An audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActionLogEntry {
    pub id: String,
    pub action: String,
    pub ts: i64,
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Usuario,
}

/// A local user account.
///
/// `password` is stored in plain text. This shape only suits a trusted,
/// single-user local context and must not be reused as a real credential scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub text: String,
    pub ts: i64,
}

//! Services module
//!
//! Business logic services that coordinate between the presentation layer
//! and the stored collections.

pub mod actions;
pub mod alerts;
pub mod chat;
pub mod drafts;
pub mod export;
pub mod incidents;
pub mod notifications;
pub mod scheduler;
pub mod settings;
pub mod users;

pub use actions::ActionLog;
pub use alerts::AlertSimulator;
pub use chat::ChatService;
pub use drafts::DraftQueue;
pub use export::{ExportBundle, ExportService};
pub use incidents::{IncidentsService, ReportOutcome, ReportSubmission};
pub use notifications::{DisplayEvent, NotificationCenter};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use settings::{AppSettings, SettingsService, Theme};
pub use users::UsersService;

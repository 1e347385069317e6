//! Engine configuration constants
//!
//! Central location for storage keys, collection caps, timer delays
//! and tag formats used throughout the engine.

// ===== Storage Keys =====

pub const KEY_INCIDENTS: &str = "incidents";
pub const KEY_DRAFTS: &str = "drafts";
pub const KEY_NOTIFICATIONS: &str = "notifications";
pub const KEY_ACTIONS: &str = "actions";
pub const KEY_USERS: &str = "users";
pub const KEY_CHATS: &str = "chats";
pub const KEY_SETTINGS: &str = "settings";

// ===== Collection Limits =====

/// Maximum number of notifications kept in the persisted history
pub const NOTIFICATION_HISTORY_CAP: usize = 10;

/// Maximum number of entries kept in the action log
pub const ACTION_LOG_CAP: usize = 50;

// ===== Timers =====

/// Delay before an auto-hiding notification is removed from history
pub const NOTIFICATION_AUTO_REMOVE_MS: u64 = 6_000;

/// Delay before a transient toast is hidden. Independent of history removal.
pub const TOAST_HIDE_MS: u64 = 5_000;

/// Interval between simulated road alerts
pub const SIMULATED_ALERT_INTERVAL_SECS: u64 = 15;

/// Fixed pool of simulated road alerts
pub const SIMULATED_ALERTS: &[&str] = &[
    "Atención: lluvia intensa en ruta",
    "Corte de tráfico en carretera",
    "Mejora el clima en zona de la sierra",
    "Nuevo reporte de derrumbe",
];

// ===== Geospatial =====

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius of the "nearby" filter
pub const NEARBY_RADIUS_KM: f64 = 50.0;

// ===== Identifiers and Tags =====

/// Prefix carried by every generated entity id
pub const ID_PREFIX: &str = "s_";

/// Length of the random part of a generated id
pub const ID_RANDOM_LEN: usize = 8;

/// Type filter value that matches every incident type
pub const TYPE_WILDCARD: &str = "all";

/// Prefix marking action log entries that echo a notification
pub const NOTIFICATION_ECHO_PREFIX: &str = "Notificación:";

/// User recorded on reports when nobody is signed in
pub const ANONYMOUS_REPORTER: &str = "anon";

/// User recorded on comments when nobody is signed in
pub const GUEST_COMMENTER: &str = "invitado";

/// Default tracing filter used by [`crate::logging::init_tracing`]
pub const DEFAULT_LOG_FILTER: &str = "safaroad=debug,info";

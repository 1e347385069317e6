//! First-run fixture data
//!
//! Seeding is keyed on the incidents collection: it only happens when that
//! key has never been written, so it runs at most once per store.

use super::{contains, save, Store};
use crate::config::{KEY_ACTIONS, KEY_CHATS, KEY_INCIDENTS, KEY_USERS};
use crate::context::Context;
use crate::database::{ActionLogEntry, ChatMessage, Incident, Role, Severity, User};
use crate::error::Result;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn fixture_incidents(ctx: &Context) -> Vec<Incident> {
    let now = ctx.now_ms();
    vec![
        Incident {
            id: ctx.next_id(),
            kind: "huayco".to_string(),
            severity: Severity::Prioritario,
            title: "Huayco detectado".to_string(),
            description: "Huayco en Carretera Central - km 45".to_string(),
            lat: Some(-12.0),
            lng: Some(-75.0),
            date: now - DAY_MS,
            image: Some("img2/huayco.jpg".to_string()),
            audio: None,
            user: "admin".to_string(),
            comments: Vec::new(),
            resolved: false,
        },
        Incident {
            id: ctx.next_id(),
            kind: "derrumbe".to_string(),
            severity: Severity::Normal,
            title: "Derrumbe moderado".to_string(),
            description: "Deslizamiento en Cusco - Ollantaytambo".to_string(),
            lat: Some(-13.0),
            lng: Some(-72.27),
            date: now - 2 * DAY_MS,
            image: Some("img2/derrumbe.jpg".to_string()),
            audio: None,
            user: "user1".to_string(),
            comments: Vec::new(),
            resolved: false,
        },
    ]
}

fn fixture_users() -> Vec<User> {
    vec![User {
        username: "admin".to_string(),
        password: "admin".to_string(),
        role: Role::Admin,
        email: None,
    }]
}

async fn save_if_absent<T>(store: &dyn Store, key: &str, value: &T) -> Result<()>
where
    T: serde::Serialize + Sync,
{
    if !contains(store, key).await? {
        save(store, key, value).await?;
    }
    Ok(())
}

/// Seed fixtures when the incidents key is absent. Returns whether seeding ran.
///
/// An unreadable store is treated as "not now": nothing is written and the
/// next initialization tries again.
pub async fn seed_fixtures(ctx: &Context) -> Result<bool> {
    let store = ctx.store.as_ref();

    match contains(store, KEY_INCIDENTS).await {
        Ok(true) => return Ok(false),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!("Skipping fixture seeding, store not readable: {}", e);
            return Ok(false);
        }
    }

    tracing::info!("Seeding first-run fixture data");

    save_if_absent(store, KEY_CHATS, &Vec::<ChatMessage>::new()).await?;
    save_if_absent(store, KEY_USERS, &fixture_users()).await?;
    save_if_absent(store, KEY_ACTIONS, &Vec::<ActionLogEntry>::new()).await?;
    // Written last so a failure above leaves the store eligible for another attempt.
    save(store, KEY_INCIDENTS, &fixture_incidents(ctx)).await?;

    Ok(true)
}

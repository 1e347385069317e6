//! Draft queue service
//!
//! Holds incidents that have not been submitted yet, newest first, and
//! moves them into the incident repository on sync.

use crate::config::KEY_DRAFTS;
use crate::context::Context;
use crate::database::{Draft, Incident, IncidentRepository};
use crate::error::Result;
use crate::storage::{load, save};

#[derive(Clone)]
pub struct DraftQueue {
    ctx: Context,
}

impl DraftQueue {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Queued drafts, newest first
    pub async fn list(&self) -> Vec<Draft> {
        load(self.ctx.store.as_ref(), KEY_DRAFTS).await
    }

    pub async fn len(&self) -> usize {
        self.list().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Put a draft at the front of the queue
    pub async fn save(&self, mut draft: Draft) -> Result<Draft> {
        if draft.id.is_empty() {
            draft.id = self.ctx.next_id();
        }
        if draft.date == 0 {
            draft.date = self.ctx.now_ms();
        }

        self.ctx
            .update(KEY_DRAFTS, |drafts: &mut Vec<Draft>| {
                drafts.insert(0, draft.clone());
                Ok(())
            })
            .await?;

        tracing::debug!("Queued draft: {}", draft.id);
        Ok(draft)
    }

    /// Move every queued draft into `repository`.
    ///
    /// Each moved incident gets a new id and the sync time as its date.
    /// The queue is cleared only after the repository write succeeded, so a
    /// failed sync leaves every draft in place. An empty queue is a no-op.
    pub async fn sync_all(&self, repository: &IncidentRepository) -> Result<Vec<Incident>> {
        // Drafts stay locked until the queue is cleared.
        let _guard = self.ctx.locks.lock(KEY_DRAFTS).await;

        let drafts = self.list().await;
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.ctx.now_ms();
        let moved: Vec<Incident> = drafts
            .into_iter()
            .map(|draft| Incident {
                id: self.ctx.next_id(),
                date: now,
                ..draft
            })
            .collect();

        let synced = repository.append_all(moved).await?;
        save(self.ctx.store.as_ref(), KEY_DRAFTS, &Vec::<Draft>::new()).await?;

        tracing::info!("Synced {} draft(s)", synced.len());
        Ok(synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ManualClock, SequentialIds};
    use crate::database::{Comment, Severity};
    use crate::error::AppError;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn create_test_queue() -> (DraftQueue, IncidentRepository, MemoryStore, Arc<ManualClock>) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let ctx = Context::new(
            Arc::new(store.clone()),
            clock.clone(),
            Arc::new(SequentialIds::new()),
        );
        (
            DraftQueue::new(ctx.clone()),
            IncidentRepository::new(ctx),
            store,
            clock,
        )
    }

    fn draft(kind: &str) -> Draft {
        Draft {
            kind: kind.to_string(),
            severity: Severity::Prioritario,
            title: format!("{} (Borrador)", kind),
            description: "pendiente".to_string(),
            lat: Some(-12.0),
            lng: Some(-75.0),
            user: "ana".to_string(),
            image: Some("data:image/png;base64,AAAA".to_string()),
            audio: Some("blob:audio-1".to_string()),
            comments: vec![Comment {
                user: "luis".to_string(),
                text: "sigue cerrado".to_string(),
                ts: 500,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_prepends() {
        let (queue, _repo, _store, _clock) = create_test_queue();

        queue.save(draft("huayco")).await.unwrap();
        queue.save(draft("derrumbe")).await.unwrap();

        let drafts = queue.list().await;
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].kind, "derrumbe");
        assert!(!drafts[0].id.is_empty());
    }

    #[tokio::test]
    async fn test_sync_moves_everything() {
        let (queue, repo, _store, clock) = create_test_queue();

        let saved_a = queue.save(draft("huayco")).await.unwrap();
        let saved_b = queue.save(draft("derrumbe")).await.unwrap();
        clock.set(9_000);

        let synced = queue.sync_all(&repo).await.unwrap();
        assert_eq!(synced.len(), 2);
        assert!(queue.is_empty().await);

        let incidents = repo.all().await;
        assert_eq!(incidents.len(), 2);
        for (incident, original) in incidents.iter().zip([&saved_b, &saved_a]) {
            assert_eq!(incident.date, 9_000);
            assert_ne!(incident.id, saved_a.id);
            assert_ne!(incident.id, saved_b.id);

            let masked = Incident {
                id: original.id.clone(),
                date: original.date,
                ..incident.clone()
            };
            assert_eq!(&masked, original);
        }
    }

    #[tokio::test]
    async fn test_sync_empty_queue_is_noop() {
        let (queue, repo, _store, _clock) = create_test_queue();

        let synced = queue.sync_all(&repo).await.unwrap();
        assert!(synced.is_empty());
        assert!(repo.all().await.is_empty());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_drafts() {
        let (queue, repo, store, _clock) = create_test_queue();

        queue.save(draft("huayco")).await.unwrap();
        store.set_read_only(true);

        let result = queue.sync_all(&repo).await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

        store.set_read_only(false);
        assert_eq!(queue.len().await, 1);
        assert!(repo.all().await.is_empty());
    }
}

//! Incident repository
//!
//! CRUD and query operations over the incidents collection.
//! Every mutation reads the whole collection, changes it and writes it back.

use super::models::*;
use crate::config::{KEY_INCIDENTS, NEARBY_RADIUS_KM, TYPE_WILDCARD};
use crate::context::Context;
use crate::error::{AppError, Result};
use crate::geo::Coordinates;
use crate::storage::load;
use std::collections::{BTreeMap, HashSet};

/// Criteria for listing incidents. The default lists everything.
#[derive(Debug, Clone, Default)]
pub struct IncidentQuery {
    /// Case-insensitive substring matched against title + description
    pub text: Option<String>,
    /// Exact type match; `None` or `"all"` matches every type
    pub kind: Option<String>,
    /// Restrict to incidents within the nearby radius of `user_location`
    pub nearby: bool,
    pub user_location: Option<Coordinates>,
}

impl IncidentQuery {
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn near(mut self, location: Coordinates) -> Self {
        self.nearby = true;
        self.user_location = Some(location);
        self
    }

    fn matches(&self, incident: &Incident, needle: Option<&str>) -> bool {
        if let Some(needle) = needle {
            let haystack = format!("{}{}", incident.title, incident.description).to_lowercase();
            if !haystack.contains(needle) {
                return false;
            }
        }

        if let Some(kind) = self.kind.as_deref() {
            if kind != TYPE_WILDCARD && incident.kind != kind {
                return false;
            }
        }

        if self.nearby {
            if let Some(location) = &self.user_location {
                if location.distance_to_incident(incident) > NEARBY_RADIUS_KM {
                    return false;
                }
            }
        }

        true
    }
}

/// Repository for incident operations
#[derive(Clone)]
pub struct IncidentRepository {
    ctx: Context,
}

impl IncidentRepository {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Every stored incident in storage order
    pub async fn all(&self) -> Vec<Incident> {
        load(self.ctx.store.as_ref(), KEY_INCIDENTS).await
    }

    /// List incidents matching `query`, newest first
    pub async fn list(&self, query: &IncidentQuery) -> Vec<Incident> {
        let needle = query
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut incidents: Vec<Incident> = self
            .all()
            .await
            .into_iter()
            .filter(|i| query.matches(i, needle.as_deref()))
            .collect();

        incidents.sort_by(|a, b| b.date.cmp(&a.date));
        incidents
    }

    /// Insert an incident, filling in a fresh id and the current time when missing
    pub async fn create(&self, incident: Incident) -> Result<Incident> {
        let mut created = self.append_all(vec![incident]).await?;
        Ok(created.remove(0))
    }

    /// Insert several incidents in one write.
    ///
    /// Empty or colliding ids are replaced with generated ones and a zero
    /// `date` becomes the current time.
    pub async fn append_all(&self, new_incidents: Vec<Incident>) -> Result<Vec<Incident>> {
        let ctx = &self.ctx;
        let now = ctx.now_ms();

        let created = ctx
            .update(KEY_INCIDENTS, |incidents: &mut Vec<Incident>| {
                let mut taken: HashSet<String> = incidents.iter().map(|i| i.id.clone()).collect();
                let mut created = Vec::with_capacity(new_incidents.len());
                for mut incident in new_incidents {
                    while incident.id.is_empty() || taken.contains(&incident.id) {
                        incident.id = ctx.next_id();
                    }
                    if incident.date == 0 {
                        incident.date = now;
                    }
                    taken.insert(incident.id.clone());
                    created.push(incident);
                }
                incidents.extend(created.iter().cloned());
                Ok(created)
            })
            .await?;

        for incident in &created {
            tracing::debug!("Created incident: {}", incident.id);
        }
        Ok(created)
    }

    /// Apply `mutate` to the incident with `id` and persist the result
    async fn modify<F>(&self, id: &str, mutate: F) -> Result<Incident>
    where
        F: FnOnce(&mut Incident),
    {
        self.ctx
            .update(KEY_INCIDENTS, |incidents: &mut Vec<Incident>| {
                let incident = incidents
                    .iter_mut()
                    .find(|i| i.id == id)
                    .ok_or_else(|| AppError::IncidentNotFound(id.to_string()))?;
                mutate(incident);
                Ok(incident.clone())
            })
            .await
    }

    /// Merge `patch` into the incident with `id`
    pub async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident> {
        let updated = self.modify(id, |incident| patch.apply(incident)).await?;

        tracing::debug!("Updated incident: {}", id);
        Ok(updated)
    }

    /// Append a comment stamped with the current time
    pub async fn add_comment(&self, id: &str, user: &str, text: &str) -> Result<Incident> {
        let comment = Comment {
            user: user.to_string(),
            text: text.to_string(),
            ts: self.ctx.now_ms(),
        };
        let updated = self
            .modify(id, |incident| incident.comments.push(comment))
            .await?;

        tracing::debug!("Added comment to incident: {}", id);
        Ok(updated)
    }

    /// Set `resolved` on every listed incident. Unknown ids are ignored.
    pub async fn set_resolved(&self, ids: &[String], value: bool) -> Result<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let affected = self
            .ctx
            .update(KEY_INCIDENTS, |incidents: &mut Vec<Incident>| {
                let mut affected = 0;
                for incident in incidents.iter_mut().filter(|i| wanted.contains(i.id.as_str())) {
                    incident.resolved = value;
                    affected += 1;
                }
                Ok(affected)
            })
            .await?;

        tracing::debug!("Set resolved={} on {} incident(s)", value, affected);
        Ok(affected)
    }

    /// Remove every listed incident. Unknown ids are ignored.
    pub async fn delete(&self, ids: &[String]) -> Result<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let removed = self
            .ctx
            .update(KEY_INCIDENTS, |incidents: &mut Vec<Incident>| {
                let before = incidents.len();
                incidents.retain(|i| !wanted.contains(i.id.as_str()));
                Ok(before - incidents.len())
            })
            .await?;

        tracing::debug!("Deleted {} incident(s)", removed);
        Ok(removed)
    }

    /// Fetch a single incident for export
    pub async fn export_one(&self, id: &str) -> Result<Incident> {
        self.all()
            .await
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::IncidentNotFound(id.to_string()))
    }

    /// Number of incidents per type
    pub async fn count_by_type(&self) -> BTreeMap<String, usize> {
        self.all().await.into_iter().fold(BTreeMap::new(), |mut acc, i| {
            *acc.entry(i.kind).or_insert(0) += 1;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ManualClock, SequentialIds};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn create_test_repo() -> (IncidentRepository, MemoryStore, Arc<ManualClock>) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let ctx = Context::new(
            Arc::new(store.clone()),
            clock.clone(),
            Arc::new(SequentialIds::new()),
        );
        (IncidentRepository::new(ctx), store, clock)
    }

    fn incident(kind: &str, title: &str, date: i64) -> Incident {
        Incident {
            kind: kind.to_string(),
            title: title.to_string(),
            date,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_date() {
        let (repo, _store, _clock) = create_test_repo();

        let created = repo.create(incident("huayco", "Huayco", 0)).await.unwrap();
        assert_eq!(created.id, "s_1");
        assert_eq!(created.date, 1_000_000);

        let fetched = repo.export_one("s_1").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_id_and_date() {
        let (repo, _store, _clock) = create_test_repo();

        let mut supplied = incident("huayco", "Huayco", 42);
        supplied.id = "s_custom".into();
        let created = repo.create(supplied).await.unwrap();

        assert_eq!(created.id, "s_custom");
        assert_eq!(created.date, 42);
    }

    #[tokio::test]
    async fn test_create_replaces_colliding_id() {
        let (repo, _store, _clock) = create_test_repo();

        let mut first = incident("huayco", "A", 1);
        first.id = "s_1".into();
        repo.create(first.clone()).await.unwrap();

        let second = repo.create(first).await.unwrap();
        assert_ne!(second.id, "s_1");
        assert_eq!(repo.all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let (repo, _store, _clock) = create_test_repo();

        repo.create(incident("huayco", "old", 10)).await.unwrap();
        repo.create(incident("huayco", "new", 30)).await.unwrap();
        repo.create(incident("huayco", "mid", 20)).await.unwrap();

        let titles: Vec<String> = repo
            .list(&IncidentQuery::default())
            .await
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_list_text_filter_is_case_insensitive() {
        let (repo, _store, _clock) = create_test_repo();

        let mut a = incident("huayco", "Huayco detectado", 1);
        a.description = "Carretera Central".into();
        repo.create(a).await.unwrap();
        repo.create(incident("derrumbe", "Derrumbe", 2)).await.unwrap();

        let found = repo.list(&IncidentQuery::default().with_text("CARRETERA")).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, "huayco");

        let all = repo.list(&IncidentQuery::default().with_text("")).await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_text_filter_spans_title_and_description() {
        let (repo, _store, _clock) = create_test_repo();

        let mut a = incident("huayco", "Hua", 1);
        a.description = "yco".into();
        repo.create(a).await.unwrap();

        let found = repo.list(&IncidentQuery::default().with_text("huayco")).await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_list_type_filter_preserves_order() {
        let (repo, _store, _clock) = create_test_repo();

        repo.create(incident("huayco", "h1", 10)).await.unwrap();
        repo.create(incident("derrumbe", "d1", 20)).await.unwrap();
        repo.create(incident("huayco", "h2", 30)).await.unwrap();

        let found = repo.list(&IncidentQuery::default().with_kind("huayco")).await;
        assert!(found.iter().all(|i| i.kind == "huayco"));
        let titles: Vec<&str> = found.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["h2", "h1"]);

        let all = repo.list(&IncidentQuery::default().with_kind("all")).await;
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_nearby() {
        let (repo, _store, _clock) = create_test_repo();

        let mut lima = incident("huayco", "Lima", 1);
        lima.lat = Some(-12.0);
        lima.lng = Some(-75.0);
        repo.create(lima).await.unwrap();

        let mut cusco = incident("derrumbe", "Cusco", 2);
        cusco.lat = Some(-13.0);
        cusco.lng = Some(-72.27);
        repo.create(cusco).await.unwrap();

        repo.create(incident("derrumbe", "Nowhere", 3)).await.unwrap();

        let here = Coordinates::new(-12.0, -75.0);
        let found = repo.list(&IncidentQuery::default().near(here)).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Lima");
    }

    #[tokio::test]
    async fn test_nearby_without_location_keeps_everything() {
        let (repo, _store, _clock) = create_test_repo();

        repo.create(incident("huayco", "Nowhere", 1)).await.unwrap();

        let query = IncidentQuery {
            nearby: true,
            ..Default::default()
        };
        assert_eq!(repo.list(&query).await.len(), 1);
    }

    #[tokio::test]
    async fn test_update() {
        let (repo, _store, _clock) = create_test_repo();

        let created = repo.create(incident("huayco", "Original", 1)).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                IncidentPatch {
                    title: Some("Updated".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Updated");
        assert_eq!(repo.export_one(&created.id).await.unwrap().title, "Updated");
    }

    #[tokio::test]
    async fn test_single_target_operations_report_not_found() {
        let (repo, _store, _clock) = create_test_repo();

        let err = repo.update("missing", IncidentPatch::default()).await.unwrap_err();
        assert!(matches!(err, AppError::IncidentNotFound(id) if id == "missing"));

        let err = repo.add_comment("missing", "ana", "hola").await.unwrap_err();
        assert!(err.is_not_found());

        let err = repo.export_one("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_comments_append_in_order() {
        let (repo, _store, clock) = create_test_repo();

        let created = repo.create(incident("huayco", "A", 1)).await.unwrap();
        repo.add_comment(&created.id, "ana", "first").await.unwrap();
        clock.advance(5);
        let updated = repo.add_comment(&created.id, "luis", "second").await.unwrap();

        let texts: Vec<&str> = updated.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(updated.comments[1].user, "luis");
        assert_eq!(updated.comments[1].ts, 1_000_005);
    }

    #[tokio::test]
    async fn test_bulk_operations_ignore_unknown_ids() {
        let (repo, _store, _clock) = create_test_repo();

        let a = repo.create(incident("huayco", "A", 1)).await.unwrap();
        repo.create(incident("huayco", "B", 2)).await.unwrap();

        let resolved = repo
            .set_resolved(&[a.id.clone(), "missing".into()], true)
            .await
            .unwrap();
        assert_eq!(resolved, 1);
        assert!(repo.export_one(&a.id).await.unwrap().resolved);

        assert_eq!(repo.set_resolved(&["missing".into()], true).await.unwrap(), 0);
        assert_eq!(repo.delete(&["missing".into()]).await.unwrap(), 0);
        assert_eq!(repo.all().await.len(), 2);

        assert_eq!(repo.delete(&[a.id.clone()]).await.unwrap(), 1);
        assert_eq!(repo.all().await.len(), 1);
        assert!(repo.export_one(&a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_count_by_type() {
        let (repo, _store, _clock) = create_test_repo();

        repo.create(incident("huayco", "A", 1)).await.unwrap();
        repo.create(incident("derrumbe", "B", 2)).await.unwrap();
        repo.create(incident("huayco", "C", 3)).await.unwrap();

        let counts = repo.count_by_type().await;
        assert_eq!(counts.get("huayco"), Some(&2));
        assert_eq!(counts.get("derrumbe"), Some(&1));
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let (repo, store, _clock) = create_test_repo();

        store.set_read_only(true);
        let result = repo.create(incident("huayco", "A", 1)).await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }
}

//! Test stores: an in-memory backend with scriptable failures, and a counting
//! wrapper that records how often each (entity, lookup) group is fetched.

use crate::prelude::graph::*;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// An in-memory store for tests.
///
/// Records are plain objects keyed by their `"id"`. Relation lookups resolve
/// through link tables registered with [`MockStore::with_related`]. Any
/// lookup group can be scripted to fail, and a flat latency can be added to
/// every call to exercise deadlines.
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    entities: HashMap<String, IndexMap<String, Object>>,
    relations: HashMap<(String, String), RelationTable>,
    failures: HashSet<String>,
    latency: Option<Duration>,
}

#[derive(Clone, Debug)]
struct RelationTable {
    target: String,
    links: HashMap<String, Vec<String>>,
}

impl MockStore {
    /// Add one record. The value must be an object carrying a string `"id"`.
    pub fn with_record(mut self, entity: impl Into<String>, record: Value) -> Self {
        let record = match record {
            Value::Object(record) => record,
            _ => panic!("mock records are objects"),
        };
        let id = record
            .get("id")
            .and_then(|id| id.as_str())
            .expect("mock records carry a string id")
            .to_string();
        self.entities
            .entry(entity.into())
            .or_insert_with(IndexMap::new)
            .insert(id, record);
        self
    }

    /// Link `id` of `entity` to records of `target` through `relation`.
    pub fn with_related(
        mut self,
        entity: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
        id: impl Into<String>,
        related: &[&str],
    ) -> Self {
        let target = target.into();
        let table = self
            .relations
            .entry((entity.into(), relation.into()))
            .or_insert_with(|| RelationTable {
                target: target.clone(),
                links: HashMap::new(),
            });
        assert_eq!(table.target, target, "one relation table, one target type");
        table
            .links
            .entry(id.into())
            .or_insert_with(Vec::new)
            .extend(related.iter().map(|id| id.to_string()));
        self
    }

    /// Script fetches of `entity` by id to fail.
    pub fn failing_by_id(mut self, entity: &str) -> Self {
        self.failures.insert(format!("by_id/{}", entity));
        self
    }

    /// Script fetches through `relation` of `entity` to fail.
    pub fn failing_related(mut self, entity: &str, relation: &str) -> Self {
        self.failures
            .insert(format!("related/{}.{}", entity, relation));
        self
    }

    /// Script collection fetches of `entity` to fail.
    pub fn failing_collection(mut self, entity: &str) -> Self {
        self.failures.insert(format!("collection/{}", entity));
        self
    }

    /// Delay every store call, to exercise request deadlines.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn simulate(&self, key: &str) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failures.contains(key) {
            return Err(StoreError::from(format!("injected failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MockStore {
    async fn fetch_by_id(
        &self,
        entity: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Object>, StoreError> {
        self.simulate(&format!("by_id/{}", entity)).await?;
        let records = match self.entities.get(entity) {
            Some(records) => records,
            None => return Ok(HashMap::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|record| (id.clone(), record.clone())))
            .collect())
    }

    async fn fetch_related(
        &self,
        entity: &str,
        relation: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<Object>>, StoreError> {
        self.simulate(&format!("related/{}.{}", entity, relation))
            .await?;
        let table = match self
            .relations
            .get(&(entity.to_string(), relation.to_string()))
        {
            Some(table) => table,
            None => return Ok(HashMap::new()),
        };
        let targets = self.entities.get(&table.target);
        Ok(ids
            .iter()
            .filter_map(|id| {
                let linked = table.links.get(id)?;
                let records = linked
                    .iter()
                    .filter_map(|target_id| {
                        targets.and_then(|records| records.get(target_id)).cloned()
                    })
                    .collect::<Vec<_>>();
                Some((id.clone(), records))
            })
            .collect())
    }

    async fn fetch_collection(&self, entity: &str) -> Result<Vec<Object>, StoreError> {
        self.simulate(&format!("collection/{}", entity)).await?;
        Ok(self
            .entities
            .get(entity)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Wraps a store and counts calls per (entity, lookup) group.
///
/// Keys look like `by_id/User`, `related/User.posts` and `collection/Post`,
/// so a test can assert exactly which round trips a query cost.
#[derive(Debug)]
pub struct CountingStore {
    counts: Mutex<HashMap<String, usize>>,
    delegate: Arc<dyn Store>,
}

impl CountingStore {
    pub fn new(delegate: Arc<dyn Store>) -> Self {
        CountingStore {
            counts: Mutex::new(HashMap::new()),
            delegate,
        }
    }

    pub fn totals(&self) -> HashMap<String, usize> {
        self.counts.lock().clone()
    }

    fn increment(&self, key: String) {
        *self.counts.lock().entry(key).or_insert(0) += 1;
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn fetch_by_id(
        &self,
        entity: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Object>, StoreError> {
        self.increment(format!("by_id/{}", entity));
        self.delegate.fetch_by_id(entity, ids).await
    }

    async fn fetch_related(
        &self,
        entity: &str,
        relation: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<Object>>, StoreError> {
        self.increment(format!("related/{}.{}", entity, relation));
        self.delegate.fetch_related(entity, relation, ids).await
    }

    async fn fetch_collection(&self, entity: &str) -> Result<Vec<Object>, StoreError> {
        self.increment(format!("collection/{}", entity));
        self.delegate.fetch_collection(entity).await
    }
}

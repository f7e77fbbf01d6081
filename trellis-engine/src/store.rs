use crate::prelude::graph::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

/// The fetch contract a storage backend implements.
///
/// Every call is batched: the engine hands over the full set of distinct ids
/// it needs for one (entity, lookup) group and expects one round trip. Ids
/// with no record are simply absent from the result, never an error. Errors
/// mean the round trip itself failed.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Fetch records of `entity` by id. The result maps each found id to its
    /// record. Absent ids are not found.
    async fn fetch_by_id(
        &self,
        entity: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Object>, StoreError>;

    /// Fetch the records related to each of `ids` through `relation`, a
    /// relation field declared on `entity`. An id missing from the result has
    /// no related records.
    async fn fetch_related(
        &self,
        entity: &str,
        relation: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<Object>>, StoreError>;

    /// Fetch every record of `entity`, in the backend's stable order.
    async fn fetch_collection(&self, entity: &str) -> Result<Vec<Object>, StoreError>;
}

use crate::prelude::graph::*;
use futures::future::join_all;
use indexmap::IndexMap;
use itertools::Itertools;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::oneshot;
use tracing::Instrument;

/// One lookup a resolver is waiting on. Structural equality is identity: two
/// equal keys are the same fetch.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) enum FetchKey {
    ById { entity: String, id: String },
    Related {
        entity: String,
        relation: String,
        id: String,
    },
    Collection { entity: String },
}

impl FetchKey {
    fn into_parts(self) -> (GroupKey, String) {
        match self {
            FetchKey::ById { entity, id } => (GroupKey::ById { entity }, id),
            FetchKey::Related {
                entity,
                relation,
                id,
            } => (GroupKey::Related { entity, relation }, id),
            FetchKey::Collection { entity } => (GroupKey::Collection { entity }, String::new()),
        }
    }
}

/// The (entity, lookup kind) part of a fetch key. One store call goes out per
/// group per dispatch.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) enum GroupKey {
    ById { entity: String },
    Related { entity: String, relation: String },
    Collection { entity: String },
}

impl GroupKey {
    fn key_for(&self, id: &str) -> FetchKey {
        match self {
            GroupKey::ById { entity } => FetchKey::ById {
                entity: entity.clone(),
                id: id.to_string(),
            },
            GroupKey::Related { entity, relation } => FetchKey::Related {
                entity: entity.clone(),
                relation: relation.clone(),
                id: id.to_string(),
            },
            GroupKey::Collection { entity } => FetchKey::Collection {
                entity: entity.clone(),
            },
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::ById { entity } => write!(f, "{}", entity),
            GroupKey::Related { entity, relation } => write!(f, "{}.{}", entity, relation),
            GroupKey::Collection { entity } => write!(f, "{} collection", entity),
        }
    }
}

pub(crate) type Outcome = Result<Value, FetchError>;

/// Request-scoped fetch coalescing.
///
/// `load` never reaches the store directly. Keys buffer until the driver sees
/// the whole resolution tree blocked, then one store call goes out per pending
/// (entity, lookup) group and every waiter is woken with its share of the
/// result. Outcomes stay cached for the rest of the request, failures
/// included, so revisiting an entity through another path is free.
#[derive(Debug)]
pub(crate) struct Loader {
    store: Arc<dyn Store>,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cache: HashMap<FetchKey, Outcome>,
    pending: IndexMap<FetchKey, Vec<oneshot::Sender<Outcome>>>,
}

impl Loader {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Loader {
            store,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Wait for the value behind `key`. Suspends until the next dispatch when
    /// the key has not been fetched yet this request.
    pub(crate) async fn load(&self, key: FetchKey) -> Outcome {
        let receiver = {
            let mut inner = self.inner.lock();
            if let Some(outcome) = inner.cache.get(&key) {
                return outcome.clone();
            }
            let (sender, receiver) = oneshot::channel();
            inner.pending.entry(key).or_insert_with(Vec::new).push(sender);
            receiver
        };
        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::ExecutionStalled),
        }
    }

    /// Run a resolution future to completion, dispatching buffered fetches
    /// every time it blocks. The future must only suspend on [`Loader::load`].
    pub(crate) async fn drive<T>(&self, fut: impl Future<Output = T>) -> Result<T, FetchError> {
        futures::pin_mut!(fut);
        loop {
            match futures::poll!(fut.as_mut()) {
                Poll::Ready(output) => return Ok(output),
                Poll::Pending => {
                    if self.dispatch_pending().await == 0 {
                        return Err(FetchError::ExecutionStalled);
                    }
                }
            }
        }
    }

    /// Issue one store call per pending (entity, lookup) group and hand each
    /// waiter its outcome. Returns the number of keys dispatched.
    pub(crate) async fn dispatch_pending(&self) -> usize {
        let pending = mem::take(&mut self.inner.lock().pending);
        if pending.is_empty() {
            return 0;
        }
        let dispatched = pending.len();

        let mut groups: IndexMap<GroupKey, Vec<(String, Vec<oneshot::Sender<Outcome>>)>> =
            IndexMap::new();
        for (key, senders) in pending {
            let (group, id) = key.into_parts();
            groups
                .entry(group)
                .or_insert_with(Vec::new)
                .push((id, senders));
        }
        tracing::debug!(
            "dispatching {} keys across: {}",
            dispatched,
            groups.keys().join(", "),
        );

        join_all(
            groups
                .into_iter()
                .map(|(group, members)| self.fetch_group(group, members)),
        )
        .await;
        dispatched
    }

    async fn fetch_group(
        &self,
        group: GroupKey,
        members: Vec<(String, Vec<oneshot::Sender<Outcome>>)>,
    ) {
        let ids = members.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>();
        let fetched: Result<HashMap<String, Value>, StoreError> = match &group {
            GroupKey::ById { entity } => self
                .store
                .fetch_by_id(entity, &ids)
                .instrument(tracing::info_span!("fetch", target = %group, keys = ids.len()))
                .await
                .map(|mut records| {
                    ids.iter()
                        .map(|id| {
                            let value = records.remove(id).map(Value::Object).unwrap_or_default();
                            (id.clone(), value)
                        })
                        .collect()
                }),
            GroupKey::Related { entity, relation } => self
                .store
                .fetch_related(entity, relation, &ids)
                .instrument(tracing::info_span!("fetch", target = %group, keys = ids.len()))
                .await
                .map(|mut linked| {
                    ids.iter()
                        .map(|id| {
                            let records = linked.remove(id).unwrap_or_default();
                            let value =
                                Value::Array(records.into_iter().map(Value::Object).collect());
                            (id.clone(), value)
                        })
                        .collect()
                }),
            GroupKey::Collection { entity } => self
                .store
                .fetch_collection(entity)
                .instrument(tracing::info_span!("fetch", target = %group, keys = ids.len()))
                .await
                .map(|records| {
                    let all = Value::Array(records.into_iter().map(Value::Object).collect());
                    ids.iter().map(|id| (id.clone(), all.clone())).collect()
                }),
        };

        let results = match fetched {
            Ok(mut values) => members
                .into_iter()
                .map(|(id, senders)| {
                    let outcome = Ok(values.remove(&id).unwrap_or_default());
                    (group.key_for(&id), outcome, senders)
                })
                .collect::<Vec<_>>(),
            Err(err) => {
                let error = FetchError::FetchFailed {
                    target: group.to_string(),
                    reason: err.reason,
                };
                members
                    .into_iter()
                    .map(|(id, senders)| (group.key_for(&id), Err(error.clone()), senders))
                    .collect::<Vec<_>>()
            }
        };
        self.complete(results);
    }

    fn complete(&self, results: Vec<(FetchKey, Outcome, Vec<oneshot::Sender<Outcome>>)>) {
        let mut inner = self.inner.lock();
        for (key, outcome, senders) in results {
            inner.cache.insert(key, outcome.clone());
            for sender in senders {
                // A waiter dropped mid-request is not an error.
                let _ = sender.send(outcome.clone());
            }
        }
    }
}

use crate::loader::{FetchKey, Loader};
use crate::prelude::graph::*;
use crate::{assembly, limits};
use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use tokio::time::timeout;

/// The in-memory result of one selection. Built during execution, folded into
/// the response document right after, never retained past one request.
#[derive(Debug)]
pub(crate) enum ResolvedNode {
    Scalar(Value),
    Object(Vec<(String, ResolvedNode)>),
    List(Vec<ResolvedNode>),
    Failed(FetchError),
}

/// Executes query shapes against a schema and a store.
///
/// Cloning is cheap; clones share the schema and the store. Every execution
/// owns a private [`Loader`], so requests in flight never share state.
#[derive(Clone, Debug)]
pub struct Executor {
    schema: Arc<Schema>,
    store: Arc<dyn Store>,
    configuration: Configuration,
}

impl Executor {
    pub fn new(schema: Arc<Schema>, store: Arc<dyn Store>, configuration: Configuration) -> Self {
        Executor {
            schema,
            store,
            configuration,
        }
    }

    /// Execute one query shape.
    ///
    /// Every outcome is a response. Shape rejections and timeouts come back
    /// with no data and one error; fetch and content failures come back as a
    /// partial document plus one error per affected field path.
    #[tracing::instrument(skip_all, level = "debug", name = "execute")]
    pub async fn execute(&self, request: Request) -> Response {
        if request.selections.is_empty() {
            return FetchError::MalformedRequest {
                reason: "the query shape selects no root fields".to_string(),
            }
            .to_response();
        }
        let limit = request.max_depth.unwrap_or(self.configuration.max_depth);
        if let Err(err) = limits::check_depth(&self.schema, &request.selections, limit) {
            return err.to_response();
        }

        let loader = Loader::new(self.store.clone());
        let resolution = loader.drive(self.resolve_request(&request, &loader));
        let resolved = match self.configuration.request_timeout {
            Some(deadline) => match timeout(deadline, resolution).await {
                Ok(resolved) => resolved,
                // Unlike a field failure, a timeout cannot compose with a
                // partial document: pending fetches are abandoned wholesale.
                Err(_) => return FetchError::RequestTimedOut.to_response(),
            },
            None => resolution.await,
        };

        match resolved {
            Ok(root) => {
                let (data, errors) = assembly::assemble(root);
                Response::builder().data(data).errors(errors).build()
            }
            Err(err) => err.to_response(),
        }
    }

    async fn resolve_request(&self, request: &Request, loader: &Loader) -> ResolvedNode {
        let fields = join_all(request.selections.iter().map(|selection| async move {
            let node = match self.schema.root_field(&selection.name) {
                Some(relation) => self.resolve_relation(selection, relation, None, loader).await,
                None => ResolvedNode::Failed(FetchError::ExecutionUnknownField {
                    parent: "query".to_string(),
                    field: selection.name.clone(),
                }),
            };
            (selection.name.clone(), node)
        }))
        .await;
        ResolvedNode::Object(fields)
    }

    /// Resolve one relation selection. `source` carries the record the
    /// relation hangs off, absent for root fields.
    fn resolve_relation<'a>(
        &'a self,
        selection: &'a Selection,
        relation: &'a Relation,
        source: Option<(&'a EntityType, &'a Object)>,
        loader: &'a Loader,
    ) -> BoxFuture<'a, ResolvedNode> {
        Box::pin(async move {
            let nested = match selection.selection_set.as_deref() {
                Some(nested) => nested,
                None => {
                    return ResolvedNode::Failed(FetchError::MalformedRequest {
                        reason: format!(
                            "relation field '{}' needs a nested shape",
                            selection.name,
                        ),
                    })
                }
            };
            let target = match self.schema.entity(&relation.target) {
                Some(target) => target,
                None => {
                    return ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                        reason: format!("relation target '{}' is not registered", relation.target),
                    })
                }
            };

            let fetched = match (&relation.resolution, source) {
                (Resolution::ForeignKey { key }, Some((_, record))) => {
                    match record.get(key.as_str()) {
                        // A null foreign key is a missing link, not a failure.
                        None | Some(Value::Null) => return ResolvedNode::Scalar(Value::Null),
                        Some(Value::String(id)) => {
                            loader
                                .load(FetchKey::ById {
                                    entity: relation.target.clone(),
                                    id: id.as_str().to_string(),
                                })
                                .await
                        }
                        Some(_) => {
                            return ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                                reason: format!("foreign key '{}' is not an id", key),
                            })
                        }
                    }
                }
                (Resolution::ReverseForeignKey, Some((entity, record)))
                | (Resolution::Junction, Some((entity, record))) => match record.get("id") {
                    Some(Value::String(id)) => {
                        loader
                            .load(FetchKey::Related {
                                entity: entity.name().to_string(),
                                relation: selection.name.clone(),
                                id: id.as_str().to_string(),
                            })
                            .await
                    }
                    _ => {
                        return ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                            reason: format!("record of '{}' has no usable id", entity.name()),
                        })
                    }
                },
                (Resolution::Collection, None) => {
                    loader
                        .load(FetchKey::Collection {
                            entity: relation.target.clone(),
                        })
                        .await
                }
                (Resolution::ByIdArgument, None) => match selection.arguments.get("id") {
                    Some(Value::String(id)) => {
                        loader
                            .load(FetchKey::ById {
                                entity: relation.target.clone(),
                                id: id.as_str().to_string(),
                            })
                            .await
                    }
                    _ => {
                        return ResolvedNode::Failed(FetchError::MalformedRequest {
                            reason: format!(
                                "root field '{}' takes a string 'id' argument",
                                selection.name,
                            ),
                        })
                    }
                },
                // The registry pins collection and by-id resolutions to root
                // fields and the others to entity fields.
                _ => {
                    return ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                        reason: format!(
                            "relation '{}' resolved against the wrong scope",
                            selection.name,
                        ),
                    })
                }
            };

            let value = match fetched {
                Ok(value) => value,
                Err(err) => return ResolvedNode::Failed(err),
            };

            match relation.cardinality {
                Cardinality::One => match value {
                    Value::Null => ResolvedNode::Scalar(Value::Null),
                    Value::Object(record) => {
                        self.resolve_record(target, &record, nested, loader).await
                    }
                    // A one-relation backed by a linking lookup gets a
                    // sequence; none is null, more than one is bad content.
                    Value::Array(records) => match records.as_slice() {
                        [] => ResolvedNode::Scalar(Value::Null),
                        [Value::Object(record)] => {
                            self.resolve_record(target, record, nested, loader).await
                        }
                        [_] => ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                            reason: format!("'{}' record is not an object", relation.target),
                        }),
                        _ => ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                            reason: format!(
                                "'{}' has {} records where one was expected",
                                relation.target,
                                records.len(),
                            ),
                        }),
                    },
                    _ => ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                        reason: format!("'{}' record is not an object", relation.target),
                    }),
                },
                Cardinality::Many => match value {
                    Value::Array(records) => {
                        let nodes = join_all(records.iter().map(|record| async move {
                            match record.as_object() {
                                Some(record) => {
                                    self.resolve_record(target, record, nested, loader).await
                                }
                                None => {
                                    ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                                        reason: format!(
                                            "'{}' record is not an object",
                                            relation.target,
                                        ),
                                    })
                                }
                            }
                        }))
                        .await;
                        ResolvedNode::List(nodes)
                    }
                    _ => ResolvedNode::Failed(FetchError::ExecutionInvalidContent {
                        reason: format!("'{}' records are not a sequence", relation.target),
                    }),
                },
            }
        })
    }

    /// Resolve the selections made on one record. Scalars copy through,
    /// relations recurse, and every failure stays pinned to its own field.
    fn resolve_record<'a>(
        &'a self,
        entity: &'a EntityType,
        record: &'a Object,
        selections: &'a [Selection],
        loader: &'a Loader,
    ) -> BoxFuture<'a, ResolvedNode> {
        Box::pin(async move {
            let fields = join_all(selections.iter().map(|selection| async move {
                let node = match entity.field(&selection.name) {
                    Some(FieldType::Scalar(_)) => {
                        if selection.selection_set.is_some() {
                            ResolvedNode::Failed(FetchError::MalformedRequest {
                                reason: format!(
                                    "scalar field '{}' does not take a nested shape",
                                    selection.name,
                                ),
                            })
                        } else {
                            match record.get(selection.name.as_str()) {
                                Some(value) => ResolvedNode::Scalar(value.clone()),
                                None => ResolvedNode::Failed(FetchError::ExecutionFieldNotFound {
                                    field: selection.name.clone(),
                                }),
                            }
                        }
                    }
                    Some(FieldType::Relation(relation)) => {
                        self.resolve_relation(selection, relation, Some((entity, record)), loader)
                            .await
                    }
                    None => ResolvedNode::Failed(FetchError::ExecutionUnknownField {
                        parent: entity.name().to_string(),
                        field: selection.name.clone(),
                    }),
                };
                (selection.name.clone(), node)
            }))
            .await;
            ResolvedNode::Object(fields)
        })
    }
}

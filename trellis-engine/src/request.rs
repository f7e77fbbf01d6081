use crate::prelude::graph::*;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// One selected field, optionally carrying arguments and a nested shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(setter(into)))]
pub struct Selection {
    /// The field name.
    pub name: String,

    /// The arguments applied to the field. Only root by-id fields take one.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    #[builder(default)]
    pub arguments: Object,

    /// The nested shape. Present exactly when the field is a relation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default)]
    pub selection_set: Option<Vec<Selection>>,
}

/// A query: the shape to mirror, as a tree of selections over the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(setter(into)))]
pub struct Request {
    /// The root selections of the shape.
    pub selections: Vec<Selection>,

    /// Overrides the configured depth limit for this request, when present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default)]
    pub max_depth: Option<usize>,
}

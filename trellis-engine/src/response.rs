use crate::prelude::graph::*;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// The outcome of executing a query.
///
/// `data` mirrors the request shape when execution produced a document, and is
/// absent when the request was rejected outright. Field-scoped failures leave
/// a null in `data` and an entry in `errors` carrying the path to the field.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(setter(into)))]
pub struct Response {
    /// The document, shaped exactly like the request.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default)]
    pub data: Option<Value>,

    /// The errors raised while producing the document.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    #[builder(default)]
    pub errors: Vec<Error>,
}

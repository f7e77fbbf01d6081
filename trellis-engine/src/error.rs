use crate::prelude::graph::*;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for execution.
///
/// These never reach the client as-is; they are converted to JSON entries in
/// the response via [`struct@Error`].
#[derive(Error, Display, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[ignore_extra_doc_attributes]
pub enum FetchError {
    /// The request was malformed: {reason}
    MalformedRequest {
        /// The reason the request was malformed.
        reason: String,
    },

    /// Query shape depth {depth} exceeds the limit of {limit} at '{path}'.
    ///
    /// Depth counts nested relation selections only. Scalar selections never
    /// contribute to it.
    DepthLimitExceeded {
        /// The depth of the first offending relation selection.
        depth: usize,

        /// The configured limit.
        limit: usize,

        /// The path of the first offending relation selection.
        path: Path,
    },

    /// The request did not complete within the configured deadline.
    RequestTimedOut,

    /// The fetch for '{target}' failed: {reason}
    ///
    /// One failed store call fails every field that was waiting on it, and
    /// nothing else.
    FetchFailed {
        /// The entity or relation the store was asked for.
        target: String,

        /// The reason the fetch failed.
        reason: String,
    },

    /// The record is missing field '{field}'.
    ExecutionFieldNotFound {
        /// The missing field.
        field: String,
    },

    /// '{parent}' has no field '{field}'.
    ExecutionUnknownField {
        /// The type the selection was made on.
        parent: String,

        /// The unknown field.
        field: String,
    },

    /// The store returned invalid content: {reason}
    ExecutionInvalidContent {
        /// The reason the content is invalid.
        reason: String,
    },

    /// Execution halted with fetches still pending.
    ExecutionStalled,
}

impl FetchError {
    /// Convert the fetch error to a response error, tagging it with the path it
    /// occurred at.
    pub fn to_response_error(&self, path: Option<Path>) -> Error {
        Error {
            message: self.to_string(),
            path,
            extensions: serde_json_bytes::to_value(self)
                .unwrap_or_default()
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Convert the fetch error to a response that rejects the whole request.
    pub fn to_response(&self) -> Response {
        Response::builder()
            .errors(vec![self.to_response_error(None)])
            .build()
    }
}

/// An error in a response, positioned by path when it concerns one field
/// rather than the request as a whole.
#[derive(Error, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The path of the field the error concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The typed form of the error.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

/// An error during schema construction. These are fatal: a registry that fails
/// validation is never served.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub enum SchemaError {
    /// Entity type '{0}' is registered more than once.
    DuplicateEntity(String),

    /// '{type_name}.{field}' targets unknown entity type '{target}'.
    UnknownRelationTarget {
        /// The type declaring the relation.
        type_name: String,

        /// The relation field.
        field: String,

        /// The missing target.
        target: String,
    },

    /// '{type_name}.{field}' names foreign key '{key}', which is not an id field of '{type_name}'.
    InvalidForeignKey {
        /// The type declaring the relation.
        type_name: String,

        /// The relation field.
        field: String,

        /// The foreign key named by the relation.
        key: String,
    },

    /// Entity type '{0}' has no 'id' field.
    MissingId(String),

    /// Root field '{0}' must resolve as a collection or by id argument.
    InvalidRootResolution(String),

    /// '{type_name}.{field}' uses a resolution reserved for root fields.
    InvalidFieldResolution {
        /// The type declaring the relation.
        type_name: String,

        /// The relation field.
        field: String,
    },

    /// '{type_name}.{field}' mixes a single-record resolution with list cardinality.
    InvalidCardinality {
        /// The type declaring the relation.
        type_name: String,

        /// The relation field.
        field: String,
    },
}

/// An error raised by a store backend.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("{reason}")]
pub struct StoreError {
    /// The reason the store call failed.
    pub reason: String,
}

impl From<String> for StoreError {
    fn from(reason: String) -> Self {
        Self { reason }
    }
}

impl From<&str> for StoreError {
    fn from(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

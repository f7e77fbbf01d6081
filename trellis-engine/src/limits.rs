//! Depth guard. Walks the query shape before any fetch is issued and rejects
//! the whole request when relation nesting goes past the configured ceiling.
//!
//! Depth counts relation selections only. Root selections sit at depth 1, and
//! every nested relation adds one. Scalars never count, so wide-but-flat
//! shapes always pass.

use crate::prelude::graph::*;

/// Check a query shape against a depth limit.
///
/// The first offending selection in declaration order is reported, with its
/// path. Unknown fields and malformed selections are left for execution to
/// report; only depth is enforced here.
pub(crate) fn check_depth(
    schema: &Schema,
    selections: &[Selection],
    limit: usize,
) -> Result<(), FetchError> {
    let mut path = Path::empty();
    check_selections(schema, None, selections, limit, 0, &mut path)
}

fn check_selections(
    schema: &Schema,
    entity: Option<&EntityType>,
    selections: &[Selection],
    limit: usize,
    depth: usize,
    path: &mut Path,
) -> Result<(), FetchError> {
    for selection in selections {
        let relation = match entity {
            None => schema.root_field(&selection.name),
            Some(entity) => match entity.field(&selection.name) {
                Some(FieldType::Relation(relation)) => Some(relation),
                _ => None,
            },
        };
        let relation = match relation {
            Some(relation) => relation,
            None => continue,
        };

        let nested_depth = depth + 1;
        path.push(PathElement::Key(selection.name.clone()));
        if nested_depth > limit {
            return Err(FetchError::DepthLimitExceeded {
                depth: nested_depth,
                limit,
                path: path.clone(),
            });
        }
        if let Some(nested) = selection.selection_set.as_deref() {
            if let Some(target) = schema.entity(&relation.target) {
                check_selections(schema, Some(target), nested, limit, nested_depth, path)?;
            }
        }
        path.pop();
    }
    Ok(())
}

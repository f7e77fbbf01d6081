use crate::executor::ResolvedNode;
use crate::prelude::graph::*;

/// Fold a resolved tree into the response document and its error list.
///
/// Pure and deterministic: the walk is depth first, in declared field order
/// and then by sequence index, so one resolved tree always yields one
/// document and one error order. Failed nodes become null at their path.
pub(crate) fn assemble(root: ResolvedNode) -> (Value, Vec<Error>) {
    let mut errors = Vec::new();
    let mut path = Path::empty();
    let document = fold(root, &mut path, &mut errors);
    (document, errors)
}

fn fold(node: ResolvedNode, path: &mut Path, errors: &mut Vec<Error>) -> Value {
    match node {
        ResolvedNode::Scalar(value) => value,
        ResolvedNode::Object(fields) => {
            let mut object = Object::with_capacity(fields.len());
            for (name, node) in fields {
                // Only the first resolution of a name shapes the document
                // and the error list; shadowed duplicates are dropped whole.
                if object.contains_key(name.as_str()) {
                    continue;
                }
                path.push(PathElement::Key(name.clone()));
                let value = fold(node, path, errors);
                path.pop();
                object.insert(name, value);
            }
            Value::Object(object)
        }
        ResolvedNode::List(nodes) => {
            let mut values = Vec::with_capacity(nodes.len());
            for (index, node) in nodes.into_iter().enumerate() {
                path.push(PathElement::Index(index));
                values.push(fold(node, path, errors));
                path.pop();
            }
            Value::Array(values)
        }
        ResolvedNode::Failed(err) => {
            errors.push(err.to_response_error(Some(path.clone())));
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json_bytes::json as bjson;

    #[test]
    fn test_failed_nodes_become_null_at_their_path() {
        let root = ResolvedNode::Object(vec![(
            "users".to_string(),
            ResolvedNode::List(vec![ResolvedNode::Object(vec![
                ("id".to_string(), ResolvedNode::Scalar(bjson!("u1"))),
                (
                    "posts".to_string(),
                    ResolvedNode::Failed(FetchError::FetchFailed {
                        target: "User.posts".to_string(),
                        reason: "boom".to_string(),
                    }),
                ),
            ])]),
        )]);

        let (document, errors) = assemble(root);

        assert_eq!(
            document,
            bjson!({ "users": [{ "id": "u1", "posts": null }] }),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, Some(Path::from("users/0/posts")));
        assert_eq!(errors[0].message, "The fetch for 'User.posts' failed: boom");
    }

    #[test]
    fn test_duplicate_names_keep_the_first_resolution() {
        let failed = || {
            ResolvedNode::Failed(FetchError::FetchFailed {
                target: "User.posts".to_string(),
                reason: "boom".to_string(),
            })
        };

        let (document, errors) = assemble(ResolvedNode::Object(vec![
            ("id".to_string(), ResolvedNode::Scalar(bjson!("u1"))),
            ("id".to_string(), failed()),
        ]));
        assert_eq!(document, bjson!({ "id": "u1" }));
        assert!(errors.is_empty());

        let (document, errors) = assemble(ResolvedNode::Object(vec![
            ("posts".to_string(), failed()),
            ("posts".to_string(), ResolvedNode::Scalar(bjson!([]))),
        ]));
        assert_eq!(document, bjson!({ "posts": null }));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, Some(Path::from("posts")));
    }

    #[test]
    fn test_error_order_follows_the_walk() {
        let missing = |field: &str| {
            ResolvedNode::Failed(FetchError::ExecutionFieldNotFound {
                field: field.to_string(),
            })
        };
        let root = ResolvedNode::Object(vec![
            (
                "a".to_string(),
                ResolvedNode::Object(vec![("x".to_string(), missing("x"))]),
            ),
            (
                "b".to_string(),
                ResolvedNode::List(vec![ResolvedNode::Scalar(bjson!(1)), missing("y")]),
            ),
        ]);

        let (document, errors) = assemble(root);

        assert_eq!(document, bjson!({ "a": { "x": null }, "b": [1, null] }));
        let paths = errors
            .iter()
            .filter_map(|error| error.path.as_ref())
            .map(|path| path.to_string())
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["/a/x".to_string(), "/b/1".to_string()]);
    }
}

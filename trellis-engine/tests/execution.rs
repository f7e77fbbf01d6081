use maplit::hashmap;
use serde_json::json;
use serde_json_bytes::json as bjson;
use std::sync::Arc;
use std::time::Duration;
use trellis_engine::prelude::*;
use trellis_engine::testing::{CountingStore, MockStore};

fn mock_store() -> MockStore {
    MockStore::default()
        .with_record(
            "User",
            bjson!({ "id": "u1", "firstName": "Ada", "lastName": "Lovelace", "email": "a@calc.org" }),
        )
        .with_record(
            "User",
            bjson!({ "id": "u2", "firstName": "Brook", "lastName": "Taylor", "email": "b@calc.org" }),
        )
        .with_record(
            "User",
            bjson!({ "id": "u3", "firstName": "Carl", "lastName": "Gauss", "email": "c@calc.org" }),
        )
        .with_record(
            "Post",
            bjson!({ "id": "p1", "title": "Notes", "content": "On the analytical engine", "authorId": "u1" }),
        )
        .with_record(
            "Post",
            bjson!({ "id": "p2", "title": "Engines", "content": "Punched cards", "authorId": "u1" }),
        )
        .with_record(
            "Post",
            bjson!({ "id": "p3", "title": "Series", "content": "On expansions", "authorId": "u2" }),
        )
        .with_record(
            "Profile",
            bjson!({
                "id": "pr1", "avatar": "ada.png", "sex": "female", "birthday": 1815,
                "country": "UK", "street": "St James", "city": "London",
                "userId": "u1", "memberTypeId": "basic",
            }),
        )
        .with_record(
            "Profile",
            bjson!({
                "id": "pr2", "avatar": "brook.png", "sex": "male", "birthday": 1685,
                "country": "DE", "street": "Unter den Linden", "city": "Berlin",
                "userId": "u2", "memberTypeId": "business",
            }),
        )
        .with_record(
            "MemberType",
            bjson!({ "id": "basic", "discount": 0.0, "monthPostsLimit": 20 }),
        )
        .with_record(
            "MemberType",
            bjson!({ "id": "business", "discount": 7.5, "monthPostsLimit": 100 }),
        )
        .with_record(
            "Subscription",
            bjson!({ "id": "s1", "subscriberId": "u1", "authorId": "u2" }),
        )
        .with_record(
            "Subscription",
            bjson!({ "id": "s2", "subscriberId": "u2", "authorId": "u3" }),
        )
        .with_related("User", "posts", "Post", "u1", &["p1", "p2"])
        .with_related("User", "posts", "Post", "u2", &["p3"])
        .with_related("User", "profile", "Profile", "u1", &["pr1"])
        .with_related("User", "profile", "Profile", "u2", &["pr2"])
        .with_related("User", "userSubscribedTo", "User", "u1", &["u2"])
        .with_related("User", "userSubscribedTo", "User", "u2", &["u3"])
        .with_related("User", "subscribedToUser", "User", "u2", &["u1"])
        .with_related("User", "subscribedToUser", "User", "u3", &["u2"])
}

fn engine(store: Arc<dyn graph::Store>) -> graph::Executor {
    let schema = Arc::new(graph::schema().expect("the built-in registry is valid"));
    graph::Executor::new(schema, store, graph::Configuration::default())
}

fn request(selections: serde_json::Value) -> graph::Request {
    serde_json::from_value(json!({ "selections": selections }))
        .expect("test shapes deserialize")
}

#[tokio::test]
async fn documents_mirror_the_requested_shape() {
    let response = engine(Arc::new(mock_store()))
        .execute(request(json!([
            {
                "name": "users",
                "selectionSet": [
                    { "name": "id" },
                    { "name": "firstName" },
                    {
                        "name": "profile",
                        "selectionSet": [
                            { "name": "city" },
                            { "name": "memberType", "selectionSet": [{ "name": "discount" }] },
                        ],
                    },
                ],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    // Only the selected fields come back, absent links are null.
    assert_eq!(
        response.data,
        Some(bjson!({
            "users": [
                {
                    "id": "u1",
                    "firstName": "Ada",
                    "profile": { "city": "London", "memberType": { "discount": 0.0 } },
                },
                {
                    "id": "u2",
                    "firstName": "Brook",
                    "profile": { "city": "Berlin", "memberType": { "discount": 7.5 } },
                },
                { "id": "u3", "firstName": "Carl", "profile": null },
            ],
        })),
    );
}

#[tokio::test]
async fn sibling_lookups_batch_into_one_fetch_per_group() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let response = engine(store.clone())
        .execute(request(json!([
            {
                "name": "users",
                "selectionSet": [
                    { "name": "id" },
                    { "name": "posts", "selectionSet": [{ "name": "id" }] },
                    {
                        "name": "userSubscribedTo",
                        "selectionSet": [
                            { "name": "id" },
                            { "name": "posts", "selectionSet": [{ "name": "id" }] },
                        ],
                    },
                ],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(
        response.data,
        Some(bjson!({
            "users": [
                {
                    "id": "u1",
                    "posts": [{ "id": "p1" }, { "id": "p2" }],
                    "userSubscribedTo": [{ "id": "u2", "posts": [{ "id": "p3" }] }],
                },
                {
                    "id": "u2",
                    "posts": [{ "id": "p3" }],
                    "userSubscribedTo": [{ "id": "u3", "posts": [] }],
                },
                { "id": "u3", "posts": [], "userSubscribedTo": [] },
            ],
        })),
    );
    // Three users' posts go out as one fetch, and the nested posts of the
    // subscribed users hit the cache from that same fetch.
    assert_eq!(
        store.totals(),
        hashmap! {
            "collection/User".to_string() => 1,
            "related/User.posts".to_string() => 1,
            "related/User.userSubscribedTo".to_string() => 1,
        },
    );
}

#[tokio::test]
async fn entities_reached_through_two_paths_fetch_once() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let response = engine(store.clone())
        .execute(request(json!([
            {
                "name": "user",
                "arguments": { "id": "u1" },
                "selectionSet": [{ "name": "id" }, { "name": "email" }],
            },
            {
                "name": "post",
                "arguments": { "id": "p1" },
                "selectionSet": [
                    { "name": "id" },
                    { "name": "author", "selectionSet": [{ "name": "id" }, { "name": "email" }] },
                ],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(
        response.data,
        Some(bjson!({
            "user": { "id": "u1", "email": "a@calc.org" },
            "post": { "id": "p1", "author": { "id": "u1", "email": "a@calc.org" } },
        })),
    );
    assert_eq!(
        store.totals(),
        hashmap! {
            "by_id/User".to_string() => 1,
            "by_id/Post".to_string() => 1,
        },
    );
}

#[tokio::test]
async fn self_referential_traversal_stays_batched() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let response = engine(store.clone())
        .execute(request(json!([
            {
                "name": "user",
                "arguments": { "id": "u1" },
                "selectionSet": [
                    { "name": "id" },
                    {
                        "name": "userSubscribedTo",
                        "selectionSet": [
                            { "name": "id" },
                            { "name": "userSubscribedTo", "selectionSet": [{ "name": "id" }] },
                        ],
                    },
                ],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(
        response.data,
        Some(bjson!({
            "user": {
                "id": "u1",
                "userSubscribedTo": [
                    { "id": "u2", "userSubscribedTo": [{ "id": "u3" }] },
                ],
            },
        })),
    );
    // One fetch per traversal level, not per user.
    assert_eq!(
        store.totals(),
        hashmap! {
            "by_id/User".to_string() => 1,
            "related/User.userSubscribedTo".to_string() => 2,
        },
    );
}

#[tokio::test]
async fn junction_records_resolve_both_ends_in_one_fetch() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let response = engine(store.clone())
        .execute(request(json!([
            {
                "name": "subscriptions",
                "selectionSet": [
                    { "name": "id" },
                    { "name": "subscriber", "selectionSet": [{ "name": "id" }] },
                    { "name": "author", "selectionSet": [{ "name": "id" }] },
                ],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(
        response.data,
        Some(bjson!({
            "subscriptions": [
                { "id": "s1", "subscriber": { "id": "u1" }, "author": { "id": "u2" } },
                { "id": "s2", "subscriber": { "id": "u2" }, "author": { "id": "u3" } },
            ],
        })),
    );
    assert_eq!(
        store.totals(),
        hashmap! {
            "collection/Subscription".to_string() => 1,
            "by_id/User".to_string() => 1,
        },
    );
}

#[tokio::test]
async fn one_failing_group_leaves_siblings_intact() {
    let store = Arc::new(CountingStore::new(Arc::new(
        mock_store().failing_related("User", "posts"),
    )));
    let response = engine(store.clone())
        .execute(request(json!([
            {
                "name": "users",
                "selectionSet": [
                    { "name": "id" },
                    { "name": "posts", "selectionSet": [{ "name": "id" }] },
                    { "name": "profile", "selectionSet": [{ "name": "city" }] },
                ],
            },
        ])))
        .await;

    assert_eq!(
        response.data,
        Some(bjson!({
            "users": [
                { "id": "u1", "posts": null, "profile": { "city": "London" } },
                { "id": "u2", "posts": null, "profile": { "city": "Berlin" } },
                { "id": "u3", "posts": null, "profile": null },
            ],
        })),
    );
    let paths = response
        .errors
        .iter()
        .filter_map(|error| error.path.as_ref())
        .map(|path| path.to_string())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["/users/0/posts", "/users/1/posts", "/users/2/posts"]);
    for error in &response.errors {
        assert_eq!(
            error.message,
            "The fetch for 'User.posts' failed: injected failure for related/User.posts",
        );
    }
    assert_eq!(
        store.totals(),
        hashmap! {
            "collection/User".to_string() => 1,
            "related/User.posts".to_string() => 1,
            "related/User.profile".to_string() => 1,
        },
    );
}

#[tokio::test]
async fn a_second_record_for_a_one_relation_is_invalid_content() {
    let store = mock_store()
        .with_record(
            "Profile",
            bjson!({
                "id": "pr9", "avatar": "ada-alt.png", "sex": "female", "birthday": 1815,
                "country": "UK", "street": "St James", "city": "Oxford",
                "userId": "u1", "memberTypeId": "basic",
            }),
        )
        .with_related("User", "profile", "Profile", "u1", &["pr9"]);

    let response = engine(Arc::new(store))
        .execute(request(json!([
            {
                "name": "user",
                "arguments": { "id": "u1" },
                "selectionSet": [
                    { "name": "firstName" },
                    { "name": "profile", "selectionSet": [{ "name": "city" }] },
                ],
            },
        ])))
        .await;

    // Two linked profiles on a one-relation is a store fault pinned to
    // that field; the sibling scalar still lands.
    assert_eq!(
        response.data,
        Some(bjson!({ "user": { "firstName": "Ada", "profile": null } })),
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "The store returned invalid content: 'Profile' has 2 records where one was expected",
    );
    assert_eq!(response.errors[0].path, Some(graph::Path::from("user/profile")));
    assert_eq!(
        response.errors[0].extensions.get("type"),
        Some(&bjson!("ExecutionInvalidContent")),
    );
}

#[tokio::test]
async fn depth_rejection_happens_before_any_fetch() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let shape = json!([
        {
            "name": "users",
            "selectionSet": [
                {
                    "name": "posts",
                    "selectionSet": [
                        {
                            "name": "author",
                            "selectionSet": [
                                {
                                    "name": "profile",
                                    "selectionSet": [
                                        { "name": "memberType", "selectionSet": [{ "name": "id" }] },
                                    ],
                                },
                            ],
                        },
                    ],
                },
            ],
        },
    ]);
    let mut request = request(shape);
    request.max_depth = Some(3);

    let response = engine(store.clone()).execute(request).await;

    assert_eq!(response.data, None);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Query shape depth 4 exceeds the limit of 3 at '/users/posts/author/profile'.",
    );
    assert_eq!(
        response.errors[0].extensions.get("type"),
        Some(&bjson!("DepthLimitExceeded")),
    );
    assert_eq!(store.totals(), hashmap! {});
}

#[tokio::test]
async fn absence_is_null_not_an_error() {
    let response = engine(Arc::new(mock_store()))
        .execute(request(json!([
            {
                "name": "user",
                "arguments": { "id": "u-missing" },
                "selectionSet": [{ "name": "id" }],
            },
            {
                "name": "post",
                "arguments": { "id": "p-missing" },
                "selectionSet": [{ "name": "id" }],
            },
        ])))
        .await;

    assert_eq!(response.errors, vec![]);
    assert_eq!(response.data, Some(bjson!({ "user": null, "post": null })));
}

#[tokio::test]
async fn unregistered_relations_surface_as_unknown_fields() {
    let response = engine(Arc::new(mock_store()))
        .execute(request(json!([
            {
                "name": "users",
                "selectionSet": [
                    { "name": "id" },
                    { "name": "memberType", "selectionSet": [{ "name": "discount" }] },
                ],
            },
        ])))
        .await;

    // Member types hang off profiles, not users.
    assert_eq!(
        response.data,
        Some(bjson!({
            "users": [
                { "id": "u1", "memberType": null },
                { "id": "u2", "memberType": null },
                { "id": "u3", "memberType": null },
            ],
        })),
    );
    assert_eq!(response.errors.len(), 3);
    assert_eq!(response.errors[0].message, "'User' has no field 'memberType'.");
    assert_eq!(response.errors[0].path, Some(graph::Path::from("users/0/memberType")));
}

#[tokio::test]
async fn identical_executions_yield_identical_documents() {
    let store = Arc::new(CountingStore::new(Arc::new(mock_store())));
    let engine = engine(store.clone());
    let shape = json!([
        {
            "name": "users",
            "selectionSet": [
                { "name": "id" },
                { "name": "posts", "selectionSet": [{ "name": "id" }, { "name": "title" }] },
            ],
        },
    ]);

    let first = engine.execute(request(shape.clone())).await;
    let second = engine.execute(request(shape)).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
    );
    // Nothing carries over between requests: the second run pays same fetches.
    assert_eq!(
        store.totals(),
        hashmap! {
            "collection/User".to_string() => 2,
            "related/User.posts".to_string() => 2,
        },
    );
}

#[tokio::test]
async fn fields_come_back_in_declaration_order() {
    let response = engine(Arc::new(mock_store()))
        .execute(request(json!([
            {
                "name": "user",
                "arguments": { "id": "u1" },
                "selectionSet": [
                    { "name": "lastName" },
                    { "name": "firstName" },
                    { "name": "id" },
                ],
            },
        ])))
        .await;

    assert_eq!(
        serde_json::to_string(&response.data.unwrap()).unwrap(),
        r#"{"user":{"lastName":"Lovelace","firstName":"Ada","id":"u1"}}"#,
    );
}

#[tokio::test(start_paused = true)]
async fn a_missed_deadline_drops_the_partial_document() {
    let store = Arc::new(mock_store().with_latency(Duration::from_millis(100)));
    let schema = Arc::new(graph::schema().expect("the built-in registry is valid"));
    let configuration = graph::Configuration::builder()
        .request_timeout(Some(Duration::from_millis(50)))
        .build();
    let engine = graph::Executor::new(schema, store, configuration);

    let response = engine
        .execute(request(json!([
            { "name": "users", "selectionSet": [{ "name": "id" }] },
        ])))
        .await;

    assert_eq!(response.data, None);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "The request did not complete within the configured deadline.",
    );
    assert_eq!(
        response.errors[0].extensions.get("type"),
        Some(&bjson!("RequestTimedOut")),
    );
}

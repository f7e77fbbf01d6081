//! The built-in registry: users with profiles, posts, member types, and a
//! subscription join table linking users to the users they follow.

use crate::prelude::graph::*;

/// Build the registry served by this engine.
///
/// Construction goes through the validating builder, so a typo in a relation
/// target or foreign key here fails at startup rather than mid-request.
pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .entity(
            EntityType::new("MemberType")
                .scalar("id", ScalarKind::Id)
                .scalar("discount", ScalarKind::Float)
                .scalar("monthPostsLimit", ScalarKind::Int),
        )
        .entity(
            EntityType::new("Profile")
                .scalar("id", ScalarKind::Id)
                .scalar("avatar", ScalarKind::String)
                .scalar("sex", ScalarKind::String)
                .scalar("birthday", ScalarKind::Int)
                .scalar("country", ScalarKind::String)
                .scalar("street", ScalarKind::String)
                .scalar("city", ScalarKind::String)
                .scalar("userId", ScalarKind::Id)
                .scalar("memberTypeId", ScalarKind::Id)
                .relation("user", Relation::one("User", Resolution::foreign_key("userId")))
                .relation(
                    "memberType",
                    Relation::one("MemberType", Resolution::foreign_key("memberTypeId")),
                ),
        )
        .entity(
            EntityType::new("Post")
                .scalar("id", ScalarKind::Id)
                .scalar("title", ScalarKind::String)
                .scalar("content", ScalarKind::String)
                .scalar("authorId", ScalarKind::Id)
                .relation("author", Relation::one("User", Resolution::foreign_key("authorId"))),
        )
        .entity(
            EntityType::new("User")
                .scalar("id", ScalarKind::Id)
                .scalar("firstName", ScalarKind::String)
                .scalar("lastName", ScalarKind::String)
                .scalar("email", ScalarKind::String)
                .relation("profile", Relation::one("Profile", Resolution::ReverseForeignKey))
                .relation("posts", Relation::many("Post", Resolution::ReverseForeignKey))
                .relation("userSubscribedTo", Relation::many("User", Resolution::Junction))
                .relation("subscribedToUser", Relation::many("User", Resolution::Junction)),
        )
        .entity(
            EntityType::new("Subscription")
                .scalar("id", ScalarKind::Id)
                .scalar("subscriberId", ScalarKind::Id)
                .scalar("authorId", ScalarKind::Id)
                .relation(
                    "subscriber",
                    Relation::one("User", Resolution::foreign_key("subscriberId")),
                )
                .relation("author", Relation::one("User", Resolution::foreign_key("authorId"))),
        )
        .root("users", Relation::many("User", Resolution::Collection))
        .root("user", Relation::one("User", Resolution::ByIdArgument))
        .root("posts", Relation::many("Post", Resolution::Collection))
        .root("post", Relation::one("Post", Resolution::ByIdArgument))
        .root("profiles", Relation::many("Profile", Resolution::Collection))
        .root("profile", Relation::one("Profile", Resolution::ByIdArgument))
        .root("memberTypes", Relation::many("MemberType", Resolution::Collection))
        .root("memberType", Relation::one("MemberType", Resolution::ByIdArgument))
        .root("subscriptions", Relation::many("Subscription", Resolution::Collection))
        .build()
}

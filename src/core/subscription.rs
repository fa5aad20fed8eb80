//! Subscription business logic - users following authors.

use crate::{
    core::user::get_user,
    entities::{Recipe, Subscription, User, recipe, subscription, user},
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Select, Set, SqlErr, prelude::*, sea_query::Query,
};
use tracing::{info, instrument, warn};

const ALREADY_SUBSCRIBED: &str = "You are already subscribed to this user.";
const NOT_SUBSCRIBED: &str = "You are not subscribed to this user.";

/// Whether `follower_id` follows `following_id`.
pub async fn is_subscribed(
    db: &DatabaseConnection,
    follower_id: i64,
    following_id: i64,
) -> Result<bool> {
    let count = Subscription::find()
        .filter(subscription::Column::FollowerId.eq(follower_id))
        .filter(subscription::Column::FollowingId.eq(following_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Makes `follower_id` follow `following_id` and returns the followed user.
///
/// # Errors
/// - [`Error::SelfSubscription`] when both ids are equal, checked before any query
/// - [`Error::NotFound`] if the target user does not exist
/// - [`Error::AlreadyPresent`] if the subscription exists
#[instrument(skip(db))]
pub async fn subscribe(
    db: &DatabaseConnection,
    follower_id: i64,
    following_id: i64,
) -> Result<user::Model> {
    if follower_id == following_id {
        warn!("User {} tried to subscribe to themselves", follower_id);
        return Err(Error::SelfSubscription);
    }
    let author = get_user(db, following_id).await?;
    if is_subscribed(db, follower_id, following_id).await? {
        return Err(Error::AlreadyPresent {
            message: ALREADY_SUBSCRIBED.to_string(),
        });
    }

    let row = subscription::ActiveModel {
        follower_id: Set(follower_id),
        following_id: Set(following_id),
        ..Default::default()
    };
    match Subscription::insert(row).exec(db).await {
        Ok(_) => {
            info!("User {} now follows {}", follower_id, following_id);
            Ok(author)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::AlreadyPresent {
                message: ALREADY_SUBSCRIBED.to_string(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Stops `follower_id` following `following_id`.
///
/// # Errors
/// - [`Error::NotFound`] if the target user does not exist
/// - [`Error::NotPresent`] if there was no subscription
#[instrument(skip(db))]
pub async fn unsubscribe(db: &DatabaseConnection, follower_id: i64, following_id: i64) -> Result<()> {
    get_user(db, following_id).await?;
    let result = Subscription::delete_many()
        .filter(subscription::Column::FollowerId.eq(follower_id))
        .filter(subscription::Column::FollowingId.eq(following_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotPresent {
            message: NOT_SUBSCRIBED.to_string(),
        });
    }
    info!("User {} unfollowed {}", follower_id, following_id);
    Ok(())
}

/// Users followed by `follower_id`, ordered by username. Left unexecuted for pagination.
#[must_use]
pub fn followed_users(follower_id: i64) -> Select<User> {
    User::find()
        .filter(
            user::Column::Id.in_subquery(
                Query::select()
                    .column(subscription::Column::FollowingId)
                    .from(Subscription)
                    .and_where(subscription::Column::FollowerId.eq(follower_id))
                    .to_owned(),
            ),
        )
        .order_by_asc(user::Column::Username)
}

/// An author's newest recipes, at most `limit` of them, plus their total count.
pub async fn author_recipes(
    db: &DatabaseConnection,
    author_id: i64,
    limit: Option<u64>,
) -> Result<(Vec<recipe::Model>, u64)> {
    let query = Recipe::find()
        .filter(recipe::Column::AuthorId.eq(author_id))
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id);
    let total = query.clone().count(db).await?;
    let recipes = match limit {
        Some(n) => query.limit(n).all(db).await?,
        None => query.all(db).await?,
    };
    Ok((recipes, total))
}

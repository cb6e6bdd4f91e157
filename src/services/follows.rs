use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::UserSummary,
    services::users,
};

/// Idempotent: following twice keeps a single edge
pub async fn follow(db_pool: &PgPool, follower_id: i64, followed_id: i64) -> AppResult<()> {
    if follower_id == followed_id {
        return Err(AppError::InvalidInput(
            "Users cannot follow themselves".to_string(),
        ));
    }

    // The follower must be a real account, the followed user merely has to exist
    users::load_actor(db_pool, follower_id).await?;
    users::ensure_user_exists(db_pool, followed_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO user_follows (follower_id, followed_id) VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(db_pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!(follower_id, followed_id, "User followed");
    }
    Ok(())
}

/// Removes the edge if present; unfollowing a stranger is not an error
pub async fn unfollow(db_pool: &PgPool, follower_id: i64, followed_id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM user_follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(followed_id)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Users following `user_id`, most recent first
pub async fn followers(db_pool: &PgPool, user_id: i64) -> AppResult<Vec<UserSummary>> {
    users::ensure_user_exists(db_pool, user_id).await?;

    let list = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username
        FROM user_follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.followed_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(list)
}

/// Users `user_id` follows, most recent first
pub async fn following(db_pool: &PgPool, user_id: i64) -> AppResult<Vec<UserSummary>> {
    users::ensure_user_exists(db_pool, user_id).await?;

    let list = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username
        FROM user_follows f
        JOIN users u ON u.id = f.followed_id
        WHERE f.follower_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(list)
}

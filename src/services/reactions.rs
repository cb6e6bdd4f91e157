use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::ReactionSummary,
    services::posts,
};

/// Likes and dislikes are mutually exclusive per user and post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    fn table(&self) -> &'static str {
        match self {
            ReactionKind::Like => "likes",
            ReactionKind::Dislike => "dislikes",
        }
    }

    fn opposite(&self) -> Self {
        match self {
            ReactionKind::Like => ReactionKind::Dislike,
            ReactionKind::Dislike => ReactionKind::Like,
        }
    }
}

/// Adds the reaction if absent (clearing the opposite one), removes it otherwise.
///
/// Toggles on the same post are serialized through a row lock on the post, so
/// a concurrent like and dislike from one user can never leave both edges.
pub async fn toggle_reaction(
    db_pool: &PgPool,
    user_id: i64,
    post_id: i64,
    kind: ReactionKind,
) -> AppResult<ReactionSummary> {
    posts::ensure_published(db_pool, post_id).await?;

    let mut tx = db_pool.begin().await?;

    // Held until commit; the post may also have vanished since the check above
    let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
    }

    let removed = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND post_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        // Not present: add it and clear the opposite reaction
        sqlx::query(&format!(
            "INSERT INTO {} (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table()
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND post_id = $2",
            kind.opposite().table()
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(user_id, post_id, ?kind, added = removed == 0, "Reaction toggled");

    reaction_summary(db_pool, user_id, post_id).await
}

/// Counts for a post plus whether this user currently likes or dislikes it
pub async fn reaction_summary(
    db_pool: &PgPool,
    user_id: i64,
    post_id: i64,
) -> AppResult<ReactionSummary> {
    let (liked, disliked, likes, dislikes): (bool, bool, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2),
            EXISTS (SELECT 1 FROM dislikes WHERE user_id = $1 AND post_id = $2),
            (SELECT COUNT(*) FROM likes WHERE post_id = $2),
            (SELECT COUNT(*) FROM dislikes WHERE post_id = $2)
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(db_pool)
    .await?;

    Ok(ReactionSummary {
        liked,
        disliked,
        likes,
        dislikes,
    })
}

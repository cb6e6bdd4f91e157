use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{Comment, User},
    services::posts,
};

const MAX_COMMENT_LEN: usize = 2000;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, u.username AS author_username, c.content, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

fn validate_comment(content: &str) -> AppResult<()> {
    let len = content.trim().chars().count();
    if len == 0 || len > MAX_COMMENT_LEN {
        return Err(AppError::InvalidInput(format!(
            "Comment must be between 1 and {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(())
}

/// Adds a comment to a published post and returns it with the author name
pub async fn add_comment(
    db_pool: &PgPool,
    user_id: i64,
    post_id: i64,
    content: &str,
) -> AppResult<Comment> {
    validate_comment(content)?;
    posts::ensure_published(db_pool, post_id).await?;

    let comment_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (post_id, user_id, content) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(content.trim())
    .fetch_one(db_pool)
    .await?;

    tracing::info!(comment_id, post_id, user_id, "Comment added");

    find_comment(db_pool, comment_id).await
}

async fn find_comment(db_pool: &PgPool, comment_id: i64) -> AppResult<Comment> {
    sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(comment_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
}

/// Comments on a published post, oldest first
pub async fn list_comments(db_pool: &PgPool, post_id: i64) -> AppResult<Vec<Comment>> {
    posts::ensure_published(db_pool, post_id).await?;

    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at, c.id"
    ))
    .bind(post_id)
    .fetch_all(db_pool)
    .await?;
    Ok(comments)
}

/// The comment author, the post author and admins may delete a comment
pub async fn delete_comment(db_pool: &PgPool, actor: &User, comment_id: i64) -> AppResult<()> {
    let comment = find_comment(db_pool, comment_id).await?;
    // The post author moderates its comments
    let post = posts::find_post(db_pool, comment.post_id).await?;

    if actor.id != comment.user_id && actor.id != post.author_id && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Not allowed to delete this comment".to_string(),
        ));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(db_pool)
        .await?;

    tracing::info!(comment_id, actor_id = actor.id, "Comment deleted");
    Ok(())
}

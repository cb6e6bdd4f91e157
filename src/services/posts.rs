use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{
        CreatePostRequest, Post, PostDetail, PostListQuery, PostPage, PostStatus, PostSummary,
        UpdatePostRequest, User,
    },
    services::taxonomy,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 50_000;

const POST_COLUMNS: &str = "id, author_id, category_id, title, content, status, views, \
                            created_at, updated_at, published_at";

/// Author, category and counters shown next to a post
#[derive(sqlx::FromRow)]
struct DetailExtras {
    author_username: String,
    category_name: Option<String>,
    likes: i64,
    dislikes: i64,
    comments: i64,
}

fn validate_title(title: &str) -> AppResult<()> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() || content.len() > MAX_CONTENT_LEN {
        return Err(AppError::InvalidInput("Invalid content".to_string()));
    }
    Ok(())
}

/// Owners and admins may modify a post
pub fn ensure_can_modify(actor: &User, post: &Post) -> AppResult<()> {
    if actor.id == post.author_id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author or an admin may modify this post".to_string(),
        ))
    }
}

/// `published_at` after a status change: set once on first publish, never cleared
fn next_published_at(
    current: Option<DateTime<Utc>>,
    status: PostStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (status, current) {
        (_, Some(at)) => Some(at),
        (PostStatus::Published, None) => Some(now),
        (PostStatus::Draft, None) => None,
    }
}

async fn ensure_category(db_pool: &PgPool, category_id: Option<i64>) -> AppResult<()> {
    if let Some(id) = category_id {
        if !taxonomy::category_exists(db_pool, id).await? {
            return Err(AppError::InvalidInput(format!("Unknown category {}", id)));
        }
    }
    Ok(())
}

/// Creates a post with its tags. Publishing right away stamps `published_at`.
pub async fn create_post(
    db_pool: &PgPool,
    author_id: i64,
    request: CreatePostRequest,
) -> AppResult<PostDetail> {
    validate_title(&request.title)?;
    validate_content(&request.content)?;
    ensure_category(db_pool, request.category_id).await?;

    let published_at = next_published_at(None, request.status, Utc::now());

    // Post row and tag links commit together
    let mut tx = db_pool.begin().await?;

    let post = sqlx::query_as::<_, Post>(&format!(
        "INSERT INTO posts (author_id, category_id, title, content, status, published_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {POST_COLUMNS}"
    ))
    .bind(author_id)
    .bind(request.category_id)
    .bind(request.title.trim())
    .bind(&request.content)
    .bind(request.status.as_str())
    .bind(published_at)
    .fetch_one(&mut *tx)
    .await?;

    taxonomy::replace_post_tags(&mut tx, post.id, &request.tags).await?;
    tx.commit().await?;

    tracing::info!(post_id = post.id, author_id, status = %post.status, "Post created");

    load_detail(db_pool, post).await
}

/// Loads a post regardless of status
pub async fn find_post(db_pool: &PgPool, post_id: i64) -> AppResult<Post> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
        .bind(post_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
}

/// Fails with NotFound unless the post exists and is published
pub async fn ensure_published(db_pool: &PgPool, post_id: i64) -> AppResult<Post> {
    let post = find_post(db_pool, post_id).await?;
    if post.status != PostStatus::Published {
        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
    }
    Ok(post)
}

async fn load_detail(db_pool: &PgPool, post: Post) -> AppResult<PostDetail> {
    let extras = sqlx::query_as::<_, DetailExtras>(
        r#"
        SELECT
            u.username AS author_username,
            c.name AS category_name,
            (SELECT COUNT(*) FROM likes WHERE post_id = p.id) AS likes,
            (SELECT COUNT(*) FROM dislikes WHERE post_id = p.id) AS dislikes,
            (SELECT COUNT(*) FROM comments WHERE post_id = p.id) AS comments
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN categories c ON c.id = p.category_id
        WHERE p.id = $1
        "#,
    )
    .bind(post.id)
    .fetch_one(db_pool)
    .await?;

    let tags: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT t.name FROM tags t
        JOIN post_tags pt ON pt.tag_id = t.id
        WHERE pt.post_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(post.id)
    .fetch_all(db_pool)
    .await?;

    Ok(PostDetail {
        post,
        author_username: extras.author_username,
        category_name: extras.category_name,
        tags,
        likes: extras.likes,
        dislikes: extras.dislikes,
        comments: extras.comments,
    })
}

/// Reads a post and counts the view. Drafts are only visible to their author and admins.
pub async fn view_post(
    db_pool: &PgPool,
    post_id: i64,
    viewer: Option<&User>,
) -> AppResult<PostDetail> {
    let mut post = find_post(db_pool, post_id).await?;

    // Hidden drafts look exactly like missing posts
    if post.status == PostStatus::Draft {
        let allowed = viewer.is_some_and(|v| v.id == post.author_id || v.is_admin());
        if !allowed {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
    } else {
        post.views =
            sqlx::query_scalar("UPDATE posts SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(post_id)
                .fetch_one(db_pool)
                .await?;
    }

    load_detail(db_pool, post).await
}

const LIST_FILTER_SQL: &str = r#"
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE p.status = 'published'
      AND ($1::text IS NULL OR c.slug = $1)
      AND ($2::text IS NULL OR EXISTS (
            SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = p.id AND t.slug = $2))
      AND ($3::bigint IS NULL OR p.author_id = $3)
"#;

/// Published posts, newest first
pub async fn list_posts(db_pool: &PgPool, query: &PostListQuery) -> AppResult<PostPage> {
    let category = query.category.as_deref().map(taxonomy::slugify);
    let tag = query.tag.as_deref().map(taxonomy::slugify);

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {LIST_FILTER_SQL}"))
        .bind(category.as_deref())
        .bind(tag.as_deref())
        .bind(query.author_id)
        .fetch_one(db_pool)
        .await?;

    let posts = sqlx::query_as::<_, PostSummary>(&format!(
        r#"
        SELECT
            p.id,
            p.title,
            p.author_id,
            u.username AS author_username,
            c.name AS category_name,
            p.published_at,
            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes,
            (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comments
        {LIST_FILTER_SQL}
        ORDER BY p.published_at DESC NULLS LAST, p.id DESC
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(category.as_deref())
    .bind(tag.as_deref())
    .bind(query.author_id)
    .bind(query.per_page())
    .bind(query.offset())
    .fetch_all(db_pool)
    .await?;

    Ok(PostPage {
        posts,
        page: query.page(),
        per_page: query.per_page(),
        total,
    })
}

/// Applies a partial update. Only the author or an admin may edit, and
/// `tags`, when present, replaces the whole tag set.
pub async fn update_post(
    db_pool: &PgPool,
    actor: &User,
    post_id: i64,
    request: UpdatePostRequest,
) -> AppResult<PostDetail> {
    let post = find_post(db_pool, post_id).await?;
    ensure_can_modify(actor, &post)?;

    let title = match request.title {
        Some(title) => {
            validate_title(&title)?;
            title.trim().to_string()
        }
        None => post.title,
    };
    let content = match request.content {
        Some(content) => {
            validate_content(&content)?;
            content
        }
        None => post.content,
    };
    let category_id = if request.clear_category {
        None
    } else if request.category_id.is_some() {
        ensure_category(db_pool, request.category_id).await?;
        request.category_id
    } else {
        post.category_id
    };
    // Unpublishing keeps the original publication date
    let status = request.status.unwrap_or(post.status);
    let published_at = next_published_at(post.published_at, status, Utc::now());

    let mut tx = db_pool.begin().await?;

    let updated = sqlx::query_as::<_, Post>(&format!(
        "UPDATE posts
         SET title = $2, content = $3, category_id = $4, status = $5, published_at = $6,
             updated_at = now()
         WHERE id = $1
         RETURNING {POST_COLUMNS}"
    ))
    .bind(post_id)
    .bind(&title)
    .bind(&content)
    .bind(category_id)
    .bind(status.as_str())
    .bind(published_at)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(tags) = &request.tags {
        taxonomy::replace_post_tags(&mut tx, post_id, tags).await?;
    }
    tx.commit().await?;

    tracing::info!(post_id, actor_id = actor.id, status = %updated.status, "Post updated");

    load_detail(db_pool, updated).await
}

/// Deletes a post; comments, reactions and tag links go with it
pub async fn delete_post(db_pool: &PgPool, actor: &User, post_id: i64) -> AppResult<()> {
    let post = find_post(db_pool, post_id).await?;
    ensure_can_modify(actor, &post)?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(db_pool)
        .await?;

    tracing::info!(post_id, actor_id = actor.id, "Post deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            role,
            bio: None,
            created_at: Utc::now(),
        }
    }

    fn post(author_id: i64) -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            author_id,
            category_id: None,
            title: "Title".to_string(),
            content: "Body".to_string(),
            status: PostStatus::Draft,
            views: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    #[test]
    fn test_modify_permissions() {
        let post = post(1);
        assert!(ensure_can_modify(&user(1, Role::User), &post).is_ok());
        assert!(ensure_can_modify(&user(2, Role::Admin), &post).is_ok());
        assert!(matches!(
            ensure_can_modify(&user(3, Role::User), &post),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_published_at_set_once() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(3);

        assert_eq!(next_published_at(None, PostStatus::Draft, now), None);
        assert_eq!(
            next_published_at(None, PostStatus::Published, now),
            Some(now)
        );
        assert_eq!(
            next_published_at(Some(earlier), PostStatus::Published, now),
            Some(earlier)
        );
        assert_eq!(
            next_published_at(Some(earlier), PostStatus::Draft, now),
            Some(earlier)
        );
    }

    #[test]
    fn test_title_and_content_validation() {
        assert!(validate_title("Hello").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(201)).is_err());
        assert!(validate_content("body").is_ok());
        assert!(validate_content("\n\t").is_err());
    }
}

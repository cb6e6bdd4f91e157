use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Category, CategoryCount, TagCount},
};

const TAG_CLOUD_TTL: u64 = 300; // 5 minutes

/// URL slug: lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Trims, lowercases and deduplicates tag names, dropping ones without a usable slug
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen_slugs = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && t.len() <= 50)
        .filter(|t| {
            let slug = slugify(t);
            !slug.is_empty() && seen_slugs.insert(slug)
        })
        .collect()
}

/// All categories with their published post counts, by name
pub async fn list_categories(db_pool: &PgPool) -> AppResult<Vec<CategoryCount>> {
    let categories = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT c.id, c.name, c.slug, COUNT(p.id) AS post_count
        FROM categories c
        LEFT JOIN posts p ON p.category_id = c.id AND p.status = 'published'
        GROUP BY c.id
        ORDER BY c.name
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(categories)
}

/// Creates a category; names whose slug is taken are a conflict
pub async fn create_category(db_pool: &PgPool, name: &str) -> AppResult<Category> {
    let name = name.trim();
    let slug = slugify(name);
    if name.is_empty() || name.len() > 64 || slug.is_empty() {
        return Err(AppError::InvalidInput(
            "Category names need 1 to 64 characters and a letter or digit".to_string(),
        ));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
    )
    .bind(name)
    .bind(&slug)
    .fetch_one(db_pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Category already exists"))?;

    tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
    Ok(category)
}

/// Deletes a category; its posts become uncategorized
pub async fn delete_category(db_pool: &PgPool, category_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Category {} not found",
            category_id
        )));
    }

    tracing::info!(category_id, "Category deleted");
    Ok(())
}

/// Whether a category with this id exists
pub async fn category_exists(db_pool: &PgPool, category_id: i64) -> AppResult<bool> {
    let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(category_id)
        .fetch_one(db_pool)
        .await?;
    Ok(exists)
}

async fn load_tag_cloud(db_pool: &PgPool) -> AppResult<Vec<TagCount>> {
    let tags = sqlx::query_as::<_, TagCount>(
        r#"
        SELECT t.id, t.name, t.slug, COUNT(p.id) AS post_count
        FROM tags t
        JOIN post_tags pt ON pt.tag_id = t.id
        JOIN posts p ON p.id = pt.post_id AND p.status = 'published'
        GROUP BY t.id
        ORDER BY post_count DESC, t.name
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(tags)
}

/// Tags used by published posts, most used first
pub async fn tag_cloud(db_pool: &PgPool, cache: &Cache) -> AppResult<Vec<TagCount>> {
    let key = CacheKey::TagCloud;
    cached!(cache, key, TAG_CLOUD_TTL, load_tag_cloud(db_pool))
}

/// Replaces the tag set of `post_id` with `tags`, creating missing tags
pub async fn replace_post_tags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    tags: &[String],
) -> AppResult<Vec<String>> {
    // Start from an empty set, then link each normalized name
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut **tx)
        .await?;

    let names = normalize_tags(tags);
    for name in &names {
        let tag_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tags (name, slug) VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(slugify(name))
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(names)
}

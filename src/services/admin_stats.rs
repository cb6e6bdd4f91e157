use sqlx::PgPool;
use std::future::Future;

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    models::{AdminStats, CategoryShare, DailyCount, TopPost, Totals},
};

const TOP_POSTS_LIMIT: i64 = 5;

/// Statistics plus the names of the sections that could not be computed
#[derive(Debug, Default)]
pub struct StatsSnapshot {
    pub stats: AdminStats,
    pub failed_sections: Vec<&'static str>,
}

impl StatsSnapshot {
    pub fn is_complete(&self) -> bool {
        self.failed_sections.is_empty()
    }
}

/// Admin dashboard statistics, cached for `ttl` seconds.
///
/// A snapshot with failed sections is still returned but never cached, so the
/// next request retries the failing queries instead of serving empty sections
/// until the TTL runs out.
pub async fn admin_stats(db_pool: &PgPool, cache: &Cache, ttl: u64) -> AppResult<AdminStats> {
    let key = CacheKey::AdminStats;
    let generation = cache.generation(&key);

    match cache.get_from_cache(&key).await {
        Ok(Some(stats)) => return Ok(stats),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, key = %key, "Cache read failed, recomputing"),
    }

    let snapshot = collect_stats(db_pool).await;
    if snapshot.is_complete() {
        cache.set_in_background(&key, &snapshot.stats, ttl, generation);
    } else {
        tracing::warn!(
            failed = ?snapshot.failed_sections,
            "Serving partial statistics without caching"
        );
    }
    Ok(snapshot.stats)
}

/// Runs each section independently; a failing section is logged and left empty
pub async fn collect_stats(db_pool: &PgPool) -> StatsSnapshot {
    let mut sections = SectionTracker::default();

    let stats = AdminStats {
        totals: sections.run("totals", totals(db_pool)).await,
        top_posts: sections.run("top_posts", top_posts(db_pool)).await,
        posts_per_category: sections
            .run("posts_per_category", posts_per_category(db_pool))
            .await,
        posts_last_7_days: sections
            .run("posts_last_7_days", posts_last_7_days(db_pool))
            .await,
    };

    StatsSnapshot {
        stats,
        failed_sections: sections.failed,
    }
}

#[derive(Default)]
struct SectionTracker {
    failed: Vec<&'static str>,
}

impl SectionTracker {
    async fn run<T: Default>(
        &mut self,
        name: &'static str,
        query: impl Future<Output = AppResult<T>>,
    ) -> T {
        match query.await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(section = name, error = %e, "Statistics query failed");
                self.failed.push(name);
                T::default()
            }
        }
    }
}

async fn totals(db_pool: &PgPool) -> AppResult<Totals> {
    let totals = sqlx::query_as::<_, Totals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS users,
            (SELECT COUNT(*) FROM posts) AS posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'published') AS published_posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'draft') AS draft_posts,
            (SELECT COUNT(*) FROM comments) AS comments,
            (SELECT COUNT(*) FROM likes) AS likes,
            (SELECT COUNT(*) FROM dislikes) AS dislikes,
            (SELECT COUNT(*) FROM categories) AS categories,
            (SELECT COUNT(*) FROM tags) AS tags,
            (SELECT COUNT(*) FROM user_follows) AS follows,
            (SELECT COUNT(*) FROM messages) AS messages
        "#,
    )
    .fetch_one(db_pool)
    .await?;
    Ok(totals)
}

async fn top_posts(db_pool: &PgPool) -> AppResult<Vec<TopPost>> {
    let posts = sqlx::query_as::<_, TopPost>(
        r#"
        SELECT p.id, p.title, u.username AS author_username, COUNT(l.user_id) AS likes
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN likes l ON l.post_id = p.id
        WHERE p.status = 'published'
        GROUP BY p.id, u.username
        ORDER BY likes DESC, p.published_at DESC NULLS LAST, p.id DESC
        LIMIT $1
        "#,
    )
    .bind(TOP_POSTS_LIMIT)
    .fetch_all(db_pool)
    .await?;
    Ok(posts)
}

async fn posts_per_category(db_pool: &PgPool) -> AppResult<Vec<CategoryShare>> {
    let shares = sqlx::query_as::<_, CategoryShare>(
        r#"
        SELECT COALESCE(c.name, 'Uncategorized') AS category, COUNT(p.id) AS posts
        FROM posts p
        LEFT JOIN categories c ON c.id = p.category_id
        GROUP BY c.name
        ORDER BY posts DESC, category
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(shares)
}

async fn posts_last_7_days(db_pool: &PgPool) -> AppResult<Vec<DailyCount>> {
    // One row per day, including days without posts
    let days = sqlx::query_as::<_, DailyCount>(
        r#"
        SELECT d.day::date AS day, COUNT(p.id) AS posts
        FROM generate_series(
            (current_date - 6)::timestamp,
            current_date::timestamp,
            interval '1 day'
        ) AS d(day)
        LEFT JOIN posts p
            ON p.status = 'published' AND p.published_at::date = d.day::date
        GROUP BY d.day
        ORDER BY d.day
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(days)
}

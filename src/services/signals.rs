//! Preference signal collection.
//!
//! Gathers what a viewer likes, writes and follows as category and tag ids,
//! plus the followed-author and exclusion sets the candidate scorer needs.

use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{CandidateQuery, SignalSet, SignalSource, SuggestionRow},
};

/// Storage seam for the recommendation engine
///
/// Each method is one independent query so that a viewer with no activity
/// simply yields empty results.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    /// Category and tag ids of the posts behind `source`, most frequent first
    async fn collect_signal_set(&self, user_id: i64, source: SignalSource)
        -> AppResult<SignalSet>;

    /// Ids of the users `user_id` follows
    async fn followed_user_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;

    /// Ids of posts `user_id` wrote or already liked
    async fn excluded_post_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;

    /// Runs the scoring query, best match first
    async fn score_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<SuggestionRow>>;
}

/// [`SignalStore`] backed by the relational store
#[derive(Clone)]
pub struct PgSignalStore {
    db_pool: PgPool,
}

impl PgSignalStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

/// Subquery yielding the `post_id`s a signal source is computed from
fn source_posts_sql(source: SignalSource) -> &'static str {
    match source {
        SignalSource::Liked => "SELECT post_id FROM likes WHERE user_id = $1",
        SignalSource::Authored => "SELECT id AS post_id FROM posts WHERE author_id = $1",
        SignalSource::Followed => {
            "SELECT p.id AS post_id
             FROM posts p
             JOIN user_follows f ON f.followed_id = p.author_id
             WHERE f.follower_id = $1 AND p.status = 'published'"
        }
    }
}

fn signal_set_sql(source: SignalSource) -> String {
    format!(
        r#"
        WITH source_posts AS ({})
        SELECT 'category'::text AS kind, p.category_id AS signal_id, COUNT(*) AS weight
        FROM posts p
        JOIN source_posts s ON s.post_id = p.id
        WHERE p.category_id IS NOT NULL
        GROUP BY p.category_id
        UNION ALL
        SELECT 'tag'::text AS kind, pt.tag_id AS signal_id, COUNT(*) AS weight
        FROM post_tags pt
        JOIN source_posts s ON s.post_id = pt.post_id
        GROUP BY pt.tag_id
        ORDER BY kind, weight DESC, signal_id
        "#,
        source_posts_sql(source)
    )
}

const SCORE_CANDIDATES_SQL: &str = r#"
    SELECT
        p.id,
        p.title,
        p.author_id,
        u.username AS author_username,
        c.name AS category_name,
        p.published_at,
        CASE
            WHEN p.author_id = ANY($3) THEN 3
            WHEN p.category_id = ANY($1) THEN 2
            WHEN EXISTS (
                SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ANY($2)
            ) THEN 1
            ELSE 0
        END AS relevance_score
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE p.status = 'published'
      AND p.author_id <> $4
      AND NOT (p.id = ANY($5))
      AND (
            p.author_id = ANY($3)
         OR p.category_id = ANY($1)
         OR EXISTS (
                SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ANY($2)
            )
      )
    ORDER BY relevance_score DESC, p.published_at DESC NULLS LAST, p.id DESC
    LIMIT $6
"#;

/// Splits `(kind, id, weight)` rows into a [`SignalSet`], keeping row order
fn rows_to_signal_set(rows: Vec<(String, i64, i64)>) -> SignalSet {
    let mut set = SignalSet::default();
    for (kind, signal_id, _weight) in rows {
        match kind.as_str() {
            "category" => set.category_ids.push(signal_id),
            "tag" => set.tag_ids.push(signal_id),
            other => tracing::warn!(kind = %other, "Unexpected signal kind"),
        }
    }
    set
}

#[async_trait::async_trait]
impl SignalStore for PgSignalStore {
    async fn collect_signal_set(
        &self,
        user_id: i64,
        source: SignalSource,
    ) -> AppResult<SignalSet> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(&signal_set_sql(source))
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?;

        let set = rows_to_signal_set(rows);
        tracing::debug!(
            user_id,
            source = %source,
            categories = set.category_ids.len(),
            tags = set.tag_ids.len(),
            "Collected preference signals"
        );
        Ok(set)
    }

    async fn followed_user_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT followed_id FROM user_follows WHERE follower_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(ids)
    }

    async fn excluded_post_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT id FROM posts WHERE author_id = $1
            UNION
            SELECT post_id FROM likes WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(ids)
    }

    async fn score_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<SuggestionRow>> {
        let rows = sqlx::query_as::<_, SuggestionRow>(SCORE_CANDIDATES_SQL)
            .bind(query.category_ids.as_slice())
            .bind(query.tag_ids.as_slice())
            .bind(query.followed_user_ids.as_slice())
            .bind(query.user_id)
            .bind(query.excluded_post_ids.as_slice())
            .bind(query.limit)
            .fetch_all(&self.db_pool)
            .await?;
        Ok(rows)
    }
}

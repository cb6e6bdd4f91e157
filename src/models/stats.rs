use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Site-wide counters shown on the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Totals {
    pub users: i64,
    pub posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub comments: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub categories: i64,
    pub tags: i64,
    pub follows: i64,
    pub messages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TopPost {
    pub id: i64,
    pub title: String,
    pub author_username: String,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct CategoryShare {
    pub category: String,
    pub posts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub posts: i64,
}

/// Snapshot returned by the admin statistics endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminStats {
    pub totals: Totals,
    pub top_posts: Vec<TopPost>,
    pub posts_per_category: Vec<CategoryShare>,
    pub posts_last_7_days: Vec<DailyCount>,
}

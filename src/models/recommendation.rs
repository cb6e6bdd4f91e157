use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

/// Maximum number of suggestions returned for one viewer
pub const MAX_SUGGESTIONS: i64 = 6;

/// Kind of activity a signal set was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Posts the viewer liked
    Liked,
    /// Posts the viewer wrote
    Authored,
    /// Published posts by users the viewer follows
    Followed,
}

impl Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalSource::Liked => write!(f, "liked"),
            SignalSource::Authored => write!(f, "authored"),
            SignalSource::Followed => write!(f, "followed"),
        }
    }
}

/// Category and tag ids from one signal source, most frequent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSet {
    pub category_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty() && self.tag_ids.is_empty()
    }
}

/// Everything the scorer needs to know about a viewer's taste
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSignals {
    pub liked: SignalSet,
    pub authored: SignalSet,
    pub followed: SignalSet,
    pub followed_user_ids: Vec<i64>,
    /// Posts the viewer wrote or already liked
    pub excluded_post_ids: Vec<i64>,
}

impl PreferenceSignals {
    pub fn set_mut(&mut self, source: SignalSource) -> &mut SignalSet {
        match source {
            SignalSource::Liked => &mut self.liked,
            SignalSource::Authored => &mut self.authored,
            SignalSource::Followed => &mut self.followed,
        }
    }

    /// True when no source yielded a category, tag or followed user
    pub fn is_empty(&self) -> bool {
        self.liked.is_empty()
            && self.authored.is_empty()
            && self.followed.is_empty()
            && self.followed_user_ids.is_empty()
    }

    /// Union of all category preferences, in order of first appearance
    pub fn combined_category_ids(&self) -> Vec<i64> {
        merge_unique([
            &self.liked.category_ids[..],
            &self.authored.category_ids[..],
            &self.followed.category_ids[..],
        ])
    }

    /// Union of all tag preferences, in order of first appearance
    pub fn combined_tag_ids(&self) -> Vec<i64> {
        merge_unique([
            &self.liked.tag_ids[..],
            &self.authored.tag_ids[..],
            &self.followed.tag_ids[..],
        ])
    }

    pub fn candidate_query(&self, user_id: i64) -> CandidateQuery {
        CandidateQuery {
            user_id,
            category_ids: self.combined_category_ids(),
            tag_ids: self.combined_tag_ids(),
            followed_user_ids: self.followed_user_ids.clone(),
            excluded_post_ids: self.excluded_post_ids.clone(),
            limit: MAX_SUGGESTIONS,
        }
    }
}

fn merge_unique<const N: usize>(lists: [&[i64]; N]) -> Vec<i64> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Bound parameters of the scoring query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub user_id: i64,
    pub category_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
    pub followed_user_ids: Vec<i64>,
    pub excluded_post_ids: Vec<i64>,
    pub limit: i64,
}

/// Why a post was suggested. Strict priority: the highest matching reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Tag = 1,
    Category = 2,
    FollowedAuthor = 3,
}

impl Relevance {
    pub fn from_score(score: i32) -> Option<Self> {
        match score {
            3 => Some(Relevance::FollowedAuthor),
            2 => Some(Relevance::Category),
            1 => Some(Relevance::Tag),
            _ => None,
        }
    }

    pub fn score(&self) -> i32 {
        *self as i32
    }

    /// Badge text shown next to a suggestion
    pub fn label(&self) -> &'static str {
        match self {
            Relevance::FollowedAuthor => "from followed user",
            Relevance::Category => "matching category",
            Relevance::Tag => "matching tag",
        }
    }
}

/// Raw row produced by the scoring query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SuggestionRow {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub author_username: String,
    pub category_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub relevance_score: i32,
}

/// A ranked suggestion ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedPost {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub author_username: String,
    pub category_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub relevance_score: i32,
    pub relevance: Relevance,
    pub relevance_label: String,
}

impl SuggestedPost {
    /// Returns `None` for rows that matched nothing
    pub fn from_row(row: SuggestionRow) -> Option<Self> {
        let relevance = Relevance::from_score(row.relevance_score)?;
        Some(Self {
            id: row.id,
            title: row.title,
            author_id: row.author_id,
            author_username: row.author_username,
            category_name: row.category_name,
            published_at: row.published_at,
            relevance_score: relevance.score(),
            relevance,
            relevance_label: relevance.label().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(categories: &[i64], tags: &[i64]) -> SignalSet {
        SignalSet {
            category_ids: categories.to_vec(),
            tag_ids: tags.to_vec(),
        }
    }

    #[test]
    fn test_default_signals_are_empty() {
        assert!(PreferenceSignals::default().is_empty());
    }

    #[test]
    fn test_followed_users_alone_are_a_signal() {
        let signals = PreferenceSignals {
            followed_user_ids: vec![42],
            ..Default::default()
        };
        assert!(!signals.is_empty());
    }

    #[test]
    fn test_exclusions_alone_are_not_a_signal() {
        let signals = PreferenceSignals {
            excluded_post_ids: vec![1, 2, 3],
            ..Default::default()
        };
        assert!(signals.is_empty());
    }

    #[test]
    fn test_combined_sets_dedup_in_first_appearance_order() {
        let signals = PreferenceSignals {
            liked: set(&[5, 2], &[10]),
            authored: set(&[2, 7], &[11, 10]),
            followed: set(&[9, 5], &[12]),
            ..Default::default()
        };

        assert_eq!(signals.combined_category_ids(), vec![5, 2, 7, 9]);
        assert_eq!(signals.combined_tag_ids(), vec![10, 11, 12]);
    }

    #[test]
    fn test_candidate_query_carries_exclusions_and_limit() {
        let signals = PreferenceSignals {
            liked: set(&[1], &[]),
            followed_user_ids: vec![8, 9],
            excluded_post_ids: vec![100, 101],
            ..Default::default()
        };

        let query = signals.candidate_query(3);
        assert_eq!(query.user_id, 3);
        assert_eq!(query.category_ids, vec![1]);
        assert!(query.tag_ids.is_empty());
        assert_eq!(query.followed_user_ids, vec![8, 9]);
        assert_eq!(query.excluded_post_ids, vec![100, 101]);
        assert_eq!(query.limit, 6);
    }

    #[test]
    fn test_relevance_scores_and_labels() {
        assert_eq!(Relevance::from_score(3), Some(Relevance::FollowedAuthor));
        assert_eq!(Relevance::from_score(2), Some(Relevance::Category));
        assert_eq!(Relevance::from_score(1), Some(Relevance::Tag));
        assert_eq!(Relevance::from_score(0), None);
        assert_eq!(Relevance::FollowedAuthor.label(), "from followed user");
        assert_eq!(Relevance::Category.label(), "matching category");
        assert_eq!(Relevance::Tag.label(), "matching tag");
        assert!(Relevance::FollowedAuthor > Relevance::Category);
        assert!(Relevance::Category > Relevance::Tag);
    }

    #[test]
    fn test_zero_score_rows_are_dropped() {
        let row = SuggestionRow {
            id: 1,
            title: "Unrelated".to_string(),
            author_id: 2,
            author_username: "bob".to_string(),
            category_name: None,
            published_at: None,
            relevance_score: 0,
        };
        assert!(SuggestedPost::from_row(row).is_none());
    }

    #[test]
    fn test_suggestion_serializes_label() {
        let row = SuggestionRow {
            id: 1,
            title: "Rust async".to_string(),
            author_id: 2,
            author_username: "bob".to_string(),
            category_name: Some("Tech".to_string()),
            published_at: None,
            relevance_score: 3,
        };
        let post = SuggestedPost::from_row(row).unwrap();
        let json = serde_json::to_value(&post).unwrap();

        assert_eq!(json["relevance"], "followed_author");
        assert_eq!(json["relevance_score"], 3);
        assert_eq!(json["relevance_label"], "from followed user");
    }
}

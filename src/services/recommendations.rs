use crate::{
    error::AppResult,
    models::{PreferenceSignals, SignalSource, SuggestedPost, MAX_SUGGESTIONS},
    services::signals::SignalStore,
};

const SOURCES: [SignalSource; 3] = [
    SignalSource::Liked,
    SignalSource::Authored,
    SignalSource::Followed,
];

/// Gathers every preference signal for `user_id`
pub async fn collect_signals(
    store: &dyn SignalStore,
    user_id: i64,
) -> AppResult<PreferenceSignals> {
    let mut signals = PreferenceSignals::default();

    for source in SOURCES {
        *signals.set_mut(source) = store.collect_signal_set(user_id, source).await?;
    }
    signals.followed_user_ids = store.followed_user_ids(user_id).await?;
    signals.excluded_post_ids = store.excluded_post_ids(user_id).await?;

    Ok(signals)
}

/// Generates personalized post suggestions
///
/// Candidates share a category or tag with what the viewer liked, wrote or
/// reads from followed users, or come from a followed author. They are ranked
/// by relevance (followed author, then category, then tag) and recency, and
/// capped at [`MAX_SUGGESTIONS`].
///
/// Never fails: storage errors are logged and yield an empty list.
pub async fn suggest_posts(store: &dyn SignalStore, user_id: i64) -> Vec<SuggestedPost> {
    match try_suggest_posts(store, user_id).await {
        Ok(suggestions) => suggestions,
        Err(e) => {
            tracing::error!(user_id, error = %e, "Recommendation query failed");
            Vec::new()
        }
    }
}

async fn try_suggest_posts(store: &dyn SignalStore, user_id: i64) -> AppResult<Vec<SuggestedPost>> {
    let signals = collect_signals(store, user_id).await?;

    if signals.is_empty() {
        tracing::debug!(user_id, "No preference signals, skipping candidate query");
        return Ok(Vec::new());
    }

    // Ranking and ordering happen in SQL; rows arrive best first
    let query = signals.candidate_query(user_id);
    let rows = store.score_candidates(&query).await?;

    let suggestions: Vec<SuggestedPost> = rows
        .into_iter()
        .filter_map(SuggestedPost::from_row)
        .take(MAX_SUGGESTIONS as usize)
        .collect();

    tracing::info!(
        user_id,
        categories = query.category_ids.len(),
        tags = query.tag_ids.len(),
        followed = query.followed_user_ids.len(),
        suggestions = suggestions.len(),
        "Recommendations computed"
    );

    Ok(suggestions)
}

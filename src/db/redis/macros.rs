/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise runs `$block`, schedules a
/// background write with `$ttl` seconds and returns the computed value. A failing
/// cache read is logged and treated as a miss, so Redis being down only costs
/// the recomputation.
///
/// The key's generation is captured before the lookup. If the key is
/// invalidated while `$block` runs, the computed value is not written back.
///
/// Must be used as the tail expression of a function returning `AppResult<T>`.
///
/// # Example
/// ```rust,no_run
/// use quillpost::{cached, db::{Cache, CacheKey}, error::AppResult, models::TagCount};
///
/// async fn load_tags() -> AppResult<Vec<TagCount>> {
///     Ok(Vec::new())
/// }
///
/// async fn tag_cloud(cache: &Cache) -> AppResult<Vec<TagCount>> {
///     cached!(cache, CacheKey::TagCloud, 300, load_tags())
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        // Remember which generation of the key this computation belongs to
        let generation = $cache.generation(&$key);

        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(error = %e, key = %$key, "Cache read failed, recomputing");
                }

                // Compute, then hand the write to the background writer
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl, generation);
                Ok(value)
            }
        }
    }};
}

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

const KEY_COUNT: usize = 2;

/// Keys of every cached value in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    AdminStats,
    TagCloud,
}

impl CacheKey {
    /// Index of the key's generation counter
    fn slot(&self) -> usize {
        match self {
            CacheKey::AdminStats => 0,
            CacheKey::TagCloud => 1,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::AdminStats => write!(f, "stats:admin"),
            CacheKey::TagCloud => write!(f, "tags:cloud"),
        }
    }
}

/// Opens a Redis client. No connection is made until the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

/// Per-key counters bumped on every invalidation
type Generations = Arc<[AtomicU64; KEY_COUNT]>;

/// Work for the background writer, applied strictly in queue order
enum CacheOp {
    Set {
        key: CacheKey,
        payload: String,
        ttl_secs: u64,
        generation: u64,
    },
    Delete {
        key: CacheKey,
    },
}

/// Read-through JSON cache. Reads hit Redis directly; writes and deletes are
/// queued to a single background task so request latency never waits on
/// Redis and a delete can never be overtaken by an older write.
#[derive(Clone)]
pub struct Cache {
    client: Client,
    ops: mpsc::UnboundedSender<CacheOp>,
    generations: Generations,
}

/// Owns the background writer; [`shutdown`](Self::shutdown) drains queued work
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Stops the writer after flushing everything already queued
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

struct CacheWriter {
    client: Client,
    queue: mpsc::UnboundedReceiver<CacheOp>,
    generations: Generations,
}

impl CacheWriter {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                next = self.queue.recv() => match next {
                    Some(op) => self.apply(op).await,
                    None => break,
                },
                _ = &mut stop => {
                    // Refuse new work, then flush what is already queued
                    self.queue.close();
                    while let Some(op) = self.queue.recv().await {
                        self.apply(op).await;
                    }
                    break;
                }
            }
        }
    }

    async fn apply(&self, op: CacheOp) {
        let (key, result) = match op {
            CacheOp::Set {
                key,
                payload,
                ttl_secs,
                generation,
            } => {
                // The key was invalidated after this value was computed
                if self.generations[key.slot()].load(Ordering::Acquire) != generation {
                    tracing::debug!(key = %key, "Dropping stale cache write");
                    return;
                }
                (key, self.set_ex(key, &payload, ttl_secs).await)
            }
            CacheOp::Delete { key } => (key, self.del(key).await),
        };

        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Cache operation failed");
        }
    }

    async fn set_ex(&self, key: CacheKey, payload: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), payload, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: CacheKey) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }
}

impl Cache {
    /// Creates the cache and spawns its writer. Must run inside a Tokio runtime.
    pub fn new(client: Client) -> (Self, CacheWriterHandle) {
        let (ops, queue) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();
        let generations: Generations = Arc::new([AtomicU64::new(0), AtomicU64::new(0)]);

        let writer = CacheWriter {
            client: client.clone(),
            queue,
            generations: generations.clone(),
        };
        let task = tokio::spawn(writer.run(stop_rx));

        let cache = Self {
            client,
            ops,
            generations,
        };
        (cache, CacheWriterHandle { stop, task })
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Current generation of `key`; pass it back to [`set_in_background`](Self::set_in_background)
    pub fn generation(&self, key: &CacheKey) -> u64 {
        self.generations[key.slot()].load(Ordering::Acquire)
    }

    /// Retrieves and deserializes a cached value, `Ok(None)` on a miss
    pub async fn get_from_cache<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(key.to_string()).await?;

        // A corrupt entry is reported, not silently recomputed
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::Internal(format!("Corrupt cache entry for {}: {}", key, e)))
        })
        .transpose()
    }

    /// Queues `value` for writing with a TTL. The write is dropped if `key` is
    /// invalidated after `generation` was read. Failures are only logged.
    pub fn set_in_background<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl_secs: u64,
        generation: u64,
    ) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization failed");
                return;
            }
        };

        let op = CacheOp::Set {
            key: *key,
            payload,
            ttl_secs,
            generation,
        };
        if self.ops.send(op).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }

    /// Marks every in-flight value for `key` stale and queues its deletion
    /// behind any write already waiting in the queue
    pub fn invalidate(&self, key: &CacheKey) {
        self.generations[key.slot()].fetch_add(1, Ordering::AcqRel);

        if self.ops.send(CacheOp::Delete { key: *key }).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping invalidation");
        } else {
            tracing::debug!(key = %key, "Cache entry invalidated");
        }
    }

    /// False once the background writer has stopped accepting work
    pub fn is_accepting_writes(&self) -> bool {
        !self.ops.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    fn unreachable_cache() -> (Cache, CacheWriterHandle) {
        Cache::new(create_redis_client("redis://127.0.0.1:1").unwrap())
    }

    #[test]
    fn test_cache_key_display() {
        assert_eq!(CacheKey::AdminStats.to_string(), "stats:admin");
        assert_eq!(CacheKey::TagCloud.to_string(), "tags:cloud");
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_error() {
        let (cache, _handle) = unreachable_cache();

        let result: AppResult<Option<String>> = cache.get_from_cache(&CacheKey::TagCloud).await;
        assert!(matches!(result, Err(AppError::Cache(_))));
    }

    #[tokio::test]
    async fn test_invalidate_bumps_only_its_key() {
        let (cache, _handle) = unreachable_cache();
        let tags_before = cache.generation(&CacheKey::TagCloud);
        let stats_before = cache.generation(&CacheKey::AdminStats);

        cache.invalidate(&CacheKey::TagCloud);

        assert_eq!(cache.generation(&CacheKey::TagCloud), tags_before + 1);
        assert_eq!(cache.generation(&CacheKey::AdminStats), stats_before);
    }

    #[tokio::test]
    async fn test_writes_after_shutdown_are_dropped() {
        let (cache, handle) = unreachable_cache();
        assert!(cache.is_accepting_writes());

        handle.shutdown().await;

        assert!(!cache.is_accepting_writes());
        // Logged and dropped, never queued
        cache.set_in_background(&CacheKey::AdminStats, &vec![1, 2, 3], 60, 0);
        assert!(!cache.is_accepting_writes());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_then_invalidate() {
        let (cache, handle) = Cache::new(create_redis_client(&redis_url()).unwrap());

        let value = vec!["rust".to_string(), "axum".to_string()];
        let generation = cache.generation(&CacheKey::TagCloud);
        cache.set_in_background(&CacheKey::TagCloud, &value, 60, generation);
        cache.invalidate(&CacheKey::TagCloud);
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&CacheKey::TagCloud).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_stale_write_does_not_resurrect_entry() {
        let (cache, handle) = Cache::new(create_redis_client(&redis_url()).unwrap());

        // Value computed before the invalidation, queued after it
        let generation = cache.generation(&CacheKey::TagCloud);
        cache.invalidate(&CacheKey::TagCloud);
        cache.set_in_background(&CacheKey::TagCloud, &vec!["stale"], 60, generation);

        let fresh_generation = cache.generation(&CacheKey::AdminStats);
        cache.set_in_background(&CacheKey::AdminStats, &vec![1], 60, fresh_generation);
        handle.shutdown().await;

        let tags: Option<Vec<String>> = cache.get_from_cache(&CacheKey::TagCloud).await.unwrap();
        assert_eq!(tags, None);
        let stats: Option<Vec<i32>> = cache.get_from_cache(&CacheKey::AdminStats).await.unwrap();
        assert_eq!(stats, Some(vec![1]));
    }
}

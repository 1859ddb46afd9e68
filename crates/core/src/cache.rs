use crate::error::SearchError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

/// Namespace prefix for every cache key this core owns.
pub const CACHE_PREFIX: &str = "pdfs";
const VERSION_KEY: &str = "pdfs:cache_version";

pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Key-value store backing the response cache. The version counter lives in
/// the same store so every service instance observes the same corpus
/// freshness.
#[async_trait]
pub trait CacheStore {
    /// Current cache version, initialized to 1 on first read.
    async fn current_version(&self) -> Result<u64, SearchError>;

    /// Atomically increments the version, invalidating the whole key space.
    /// Returns the new value.
    async fn bump_version(&self) -> Result<u64, SearchError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SearchError>;

    async fn put(&self, key: &str, body: &str, ttl_secs: u64) -> Result<(), SearchError>;

    /// Removes every cached entry under the namespace. The version counter
    /// survives so observed versions never decrease.
    async fn clear_namespace(&self) -> Result<(), SearchError>;
}

/// Canonical cache key: route, query parameters sorted by name, and the
/// version the entry was written under. Parameter order on the wire never
/// changes the key; a version bump always does.
pub fn cache_key(route: &str, params: &[(&str, &str)], version: u64) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by(|left, right| left.0.cmp(right.0));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in sorted {
        serializer.append_pair(name, value);
    }
    let query_string = serializer.finish();

    if query_string.is_empty() {
        format!("{CACHE_PREFIX}:v{version}:{route}")
    } else {
        format!("{CACHE_PREFIX}:v{version}:{route}?{query_string}")
    }
}

/// Redis-backed cache store.
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, SearchError> {
        let client = redis::Client::open(redis_url)
            .map_err(|error| SearchError::Cache(error.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|error| SearchError::Cache(error.to_string()))?;
        Ok(Self { connection })
    }
}

fn cache_error(error: redis::RedisError) -> SearchError {
    SearchError::Cache(error.to_string())
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn current_version(&self) -> Result<u64, SearchError> {
        let mut conn = self.connection.clone();
        let existing: Option<u64> = conn.get(VERSION_KEY).await.map_err(cache_error)?;
        if let Some(version) = existing {
            return Ok(version);
        }
        // First reader initializes the counter; SET NX keeps a concurrent
        // bump from being overwritten.
        let _: bool = conn.set_nx(VERSION_KEY, 1u64).await.map_err(cache_error)?;
        let version: u64 = conn.get(VERSION_KEY).await.map_err(cache_error)?;
        Ok(version)
    }

    async fn bump_version(&self) -> Result<u64, SearchError> {
        let mut conn = self.connection.clone();
        conn.incr(VERSION_KEY, 1u64).await.map_err(cache_error)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SearchError> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn put(&self, key: &str, body: &str, ttl_secs: u64) -> Result<(), SearchError> {
        let mut conn = self.connection.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(body)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn clear_namespace(&self) -> Result<(), SearchError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{CACHE_PREFIX}:*");

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn
                .scan_match::<_, String>(&pattern)
                .await
                .map_err(cache_error)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        keys.retain(|key| key != VERSION_KEY);

        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let _: () = conn.del(keys).await.map_err(cache_error)?;
        Ok(())
    }
}

/// Read-through/write-through response cache. Store failures on the read
/// and write paths degrade to cache-bypass behavior; only `bump` surfaces
/// its error, because a missed bump after a successful mutation is an
/// inconsistency the caller must log.
pub struct ResponseCache<S: CacheStore> {
    store: S,
    ttl_secs: u64,
}

impl<S: CacheStore + Send + Sync> ResponseCache<S> {
    pub fn new(store: S, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Current version as the store reports it; useful for operators
    /// diagnosing stale-cache reports.
    pub async fn version(&self) -> Result<u64, SearchError> {
        self.store.current_version().await
    }

    pub async fn read(&self, route: &str, params: &[(&str, &str)]) -> Option<String> {
        let version = match self.store.current_version().await {
            Ok(version) => version,
            Err(error) => {
                warn!(%error, route, "cache version read failed, bypassing cache");
                return None;
            }
        };

        match self.store.get(&cache_key(route, params, version)).await {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, route, "cache read failed, bypassing cache");
                None
            }
        }
    }

    pub async fn write(&self, route: &str, params: &[(&str, &str)], body: &str) {
        let version = match self.store.current_version().await {
            Ok(version) => version,
            Err(error) => {
                warn!(%error, route, "cache version read failed, skipping cache write");
                return;
            }
        };

        let key = cache_key(route, params, version);
        if let Err(error) = self.store.put(&key, body, self.ttl_secs).await {
            warn!(%error, route, "cache write failed, response served uncached");
        }
    }

    pub async fn bump(&self) -> Result<u64, SearchError> {
        self.store.bump_version().await
    }

    pub async fn clear(&self) -> Result<(), SearchError> {
        self.store.clear_namespace().await
    }
}

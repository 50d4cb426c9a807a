/// Namespaced Redis cache with graceful degradation.
///
/// Every key is prefixed with the namespace given at construction, so one Redis
/// instance can back several services. Values are stored as JSON strings.
///
/// Nothing here returns an error: reads yield `None` and writes yield `false` when
/// Redis is unconfigured, unreachable, or returns garbage. Callers always keep a
/// path to the real data source.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

const SCAN_BATCH: usize = 100;

pub struct RedisCache {
    client: Option<redis::Client>,
    namespace: String,
}

impl RedisCache {
    /// Build a cache for `url`. A missing URL or an unparsable one yields a cache
    /// that is permanently disabled.
    pub fn new(url: Option<&str>, namespace: impl Into<String>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "invalid redis url, cache disabled"))
                .ok()
        });
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn disabled(namespace: impl Into<String>) -> Self {
        Self {
            client: None,
            namespace: namespace.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full Redis key for a namespace-relative key.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Sends a PING. `false` when disabled or unreachable.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        let full_key = self.key(key);
        let raw: Option<String> = conn
            .get(&full_key)
            .await
            .inspect_err(|e| warn!(error = %e, key = %full_key, "redis GET failed"))
            .ok()?;
        serde_json::from_str(&raw?)
            .inspect_err(|e| warn!(error = %e, key = %full_key, "cached value is not valid JSON"))
            .ok()
    }

    /// Store `value` as JSON. `ttl_secs` of `None` stores without expiry.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let Ok(json) = serde_json::to_string(value)
            .inspect_err(|e| warn!(error = %e, key, "failed to serialize cache value"))
        else {
            return false;
        };
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let full_key = self.key(key);
        let written = match ttl_secs {
            Some(ttl) => conn.set_ex::<_, _, ()>(&full_key, json, ttl).await,
            None => conn.set::<_, _, ()>(&full_key, json).await,
        };
        written
            .inspect_err(|e| warn!(error = %e, key = %full_key, "redis SET failed"))
            .is_ok()
    }

    /// Drop every key under this cache's namespace. Walks the keyspace with SCAN so a
    /// large instance is never blocked by KEYS.
    pub async fn invalidate(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pattern = format!("{}*", self.namespace);
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next, keys) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };
            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, pattern, "redis DEL failed during invalidation");
                    return false;
                }
            }
            if next == 0 {
                return true;
            }
            cursor = next;
        }
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }
}

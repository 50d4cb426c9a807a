/// Redis caching layer for the school catalog.
///
/// All operations degrade: reads return `None` and writes are skipped when Redis is
/// unavailable.
///
/// Key schema:
/// - `sd:v1:schools`: JSON `CachedSchools` (TTL)
/// - `sd:v1:options:{wire_key}`: JSON Vec<String> of dynamic options (TTL)
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::CatalogSource;
use discovery_common::redis::RedisCache;

pub const KEY_PREFIX: &str = "sd:v1:";

/// Raw rows as loaded, with the source they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSchools {
    pub source: CatalogSource,
    pub rows: Vec<Value>,
}

pub struct CatalogCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl CatalogCache {
    pub fn new(redis_url: &str, ttl_secs: u64) -> Self {
        Self {
            redis: RedisCache::new(Some(redis_url), KEY_PREFIX),
            ttl_secs,
        }
    }

    pub fn disabled() -> Self {
        Self {
            redis: RedisCache::disabled(KEY_PREFIX),
            ttl_secs: 0,
        }
    }

    pub async fn is_available(&self) -> bool {
        self.redis.is_available().await
    }

    pub async fn get_schools(&self) -> Option<CachedSchools> {
        let cached: CachedSchools = self.redis.get_json("schools").await?;
        debug!(rows = cached.rows.len(), source = cached.source.as_str(), "school list cache hit");
        Some(cached)
    }

    pub async fn set_schools(&self, schools: &CachedSchools) {
        if !self.redis.set_json("schools", schools, Some(self.ttl_secs)).await
            && self.redis.is_enabled()
        {
            warn!("failed to cache school list");
        }
    }

    pub async fn get_options(&self, wire_key: &str) -> Option<Vec<String>> {
        self.redis.get_json(&options_key(wire_key)).await
    }

    pub async fn set_options(&self, wire_key: &str, options: &[String]) {
        self.redis
            .set_json(&options_key(wire_key), options, Some(self.ttl_secs))
            .await;
    }

    pub async fn invalidate_all(&self) {
        if self.redis.is_enabled() && !self.redis.invalidate().await {
            warn!(prefix = KEY_PREFIX, "catalog cache invalidation incomplete");
        }
    }
}

fn options_key(wire_key: &str) -> String {
    format!("options:{wire_key}")
}

//! 通用有界缓存
//!
//! 容量 + TTL 双重约束的泛型缓存，供去重闸门等场景使用。
//! 决策输入永远即时读取，绝不经过这里。

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::app_config::redis as app_redis;

/// 缓存提供者接口
#[async_trait::async_trait]
pub trait CacheProvider<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<T>>;

    async fn set(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

struct CacheEntry<T> {
    value: T,
    expire_at: Option<Instant>,
}

impl<T: Clone> CacheEntry<T> {
    fn is_expired(&self) -> bool {
        match self.expire_at {
            Some(expire_at) => Instant::now() > expire_at,
            None => false,
        }
    }
}

/// 进程内缓存（DashMap）
///
/// 读时惰性过期；容量打满后按插入顺序淘汰最老的键。
pub struct InMemoryCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    map: DashMap<String, CacheEntry<T>>,
    insert_order: Mutex<VecDeque<String>>,
    capacity: usize,
    default_ttl: Option<Duration>,
}

impl<T> InMemoryCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            map: DashMap::new(),
            insert_order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            default_ttl,
        }
    }

    fn evict_if_full(&self) {
        let mut order = self.insert_order.lock().expect("insert_order poisoned");
        while self.map.len() >= self.capacity {
            match order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[async_trait::async_trait]
impl<T> CacheProvider<T> for InMemoryCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        if let Some(entry) = self.map.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            self.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        self.evict_if_full();
        let expire_at = ttl_secs
            .map(Duration::from_secs)
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        self.map.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expire_at,
            },
        );
        self.insert_order
            .lock()
            .expect("insert_order poisoned")
            .push_back(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Redis 缓存
pub struct RedisCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    key_prefix: String,
    default_ttl_secs: u64,
    _phantom: PhantomData<T>,
}

impl<T> RedisCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(key_prefix: String, default_ttl_secs: u64) -> Self {
        Self {
            key_prefix,
            default_ttl_secs,
            _phantom: PhantomData,
        }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait::async_trait]
impl<T> CacheProvider<T> for RedisCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        let mut conn = app_redis::get_redis_connection().await?;
        let result: Option<String> = conn.get(self.make_key(key)).await?;
        match result {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = app_redis::get_redis_connection().await?;
        let payload = serde_json::to_string(value)?;
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let _: () = conn.set_ex(self.make_key(key), payload, ttl).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = app_redis::get_redis_connection().await?;
        let _: () = conn.del(self.make_key(key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = app_redis::get_redis_connection().await?;
        Ok(conn.exists(self.make_key(key)).await?)
    }
}

/// 双层缓存：内存必走，Redis 尽力而为
///
/// Redis 不可用时降级为纯内存并记录日志，错误不向上传播。
pub struct TwoLevelCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    memory: InMemoryCache<T>,
    redis: Option<RedisCache<T>>,
}

impl<T> TwoLevelCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        key_prefix: &str,
        capacity: usize,
        ttl_secs: u64,
        with_redis: bool,
    ) -> Self {
        Self {
            memory: InMemoryCache::new(capacity, Some(Duration::from_secs(ttl_secs))),
            redis: with_redis.then(|| RedisCache::new(key_prefix.to_string(), ttl_secs)),
        }
    }

    pub fn memory_only(key_prefix: &str, capacity: usize, ttl_secs: u64) -> Self {
        Self::new(key_prefix, capacity, ttl_secs, false)
    }
}

#[async_trait::async_trait]
impl<T> CacheProvider<T> for TwoLevelCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        if let Some(value) = self.memory.get(key).await? {
            return Ok(Some(value));
        }
        if let Some(redis) = &self.redis {
            match redis.get(key).await {
                Ok(Some(value)) => {
                    debug!("二级缓存Redis命中回填内存: key={}", key);
                    let _ = self.memory.set(key, &value, None).await;
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(e) => warn!("Redis读取失败，降级为内存缓存: key={}, err={}", key, e),
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        self.memory.set(key, value, ttl_secs).await?;
        if let Some(redis) = &self.redis {
            if let Err(e) = redis.set(key, value, ttl_secs).await {
                warn!("Redis写入失败，仅内存生效: key={}, err={}", key, e);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.memory.delete(key).await?;
        if let Some(redis) = &self.redis {
            if let Err(e) = redis.delete(key).await {
                warn!("Redis删除失败: key={}, err={}", key, e);
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if self.memory.exists(key).await? {
            return Ok(true);
        }
        if let Some(redis) = &self.redis {
            match redis.exists(key).await {
                Ok(found) => return Ok(found),
                Err(e) => warn!("Redis查询失败: key={}, err={}", key, e),
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = InMemoryCache::<String>::new(16, Some(Duration::from_secs(60)));
        cache.set("k1", &"v1".to_string(), None).await.unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), Some("v1".to_string()));

        cache.delete("k1").await.unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expires() {
        let cache = InMemoryCache::<String>::new(16, None);
        cache.set("k1", &"v1".to_string(), Some(0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_capacity_evicts_oldest() {
        let cache = InMemoryCache::<i64>::new(2, None);
        cache.set("a", &1, None).await.unwrap();
        cache.set("b", &2, None).await.unwrap();
        cache.set("c", &3, None).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("c").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_two_level_without_redis_is_memory_only() {
        let cache = TwoLevelCache::<String>::memory_only("test", 16, 60);
        cache.set("k1", &"v1".to_string(), None).await.unwrap();
        assert!(cache.exists("k1").await.unwrap());
    }
}

//! 决策引擎可调参数
//!
//! 全部在启动时从环境读取一次，运行期不变。

use super::env::env_or_default;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 分片数，0 表示取可用并行度
    pub stripe_count: usize,
    /// 每分片任务队列容量
    pub queue_capacity: usize,
    /// 触发通道容量
    pub router_queue_capacity: usize,
    /// 触发通道消费工作者数
    pub router_workers: usize,
    /// 通用事件陈旧阈值（秒），相对最近处理时间的尽力过滤
    pub staleness_secs: i64,
    /// 信号触发的最大年龄（秒）
    pub signal_max_age_secs: i64,
    /// 去重标记存活时间（秒）
    pub dedup_ttl_secs: u64,
    /// 去重缓存容量
    pub dedup_capacity: usize,
    /// 价格触发冷却窗口（秒）
    pub price_cooldown_secs: i64,
    /// 关闭时的排空等待（秒）
    pub drain_timeout_secs: u64,
    /// 去重缓存是否挂 Redis 第二层
    pub dedup_use_redis: bool,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stripe_count: 0,
            queue_capacity: 256,
            router_queue_capacity: 1024,
            router_workers: 2,
            staleness_secs: 3600,
            signal_max_age_secs: 30,
            dedup_ttl_secs: 3600,
            dedup_capacity: 65536,
            price_cooldown_secs: 5,
            drain_timeout_secs: 10,
            dedup_use_redis: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stripe_count: parse_or("ENGINE_STRIPE_COUNT", defaults.stripe_count),
            queue_capacity: parse_or("ENGINE_QUEUE_CAPACITY", defaults.queue_capacity),
            router_queue_capacity: parse_or(
                "ENGINE_ROUTER_QUEUE_CAPACITY",
                defaults.router_queue_capacity,
            ),
            router_workers: parse_or("ENGINE_ROUTER_WORKERS", defaults.router_workers),
            staleness_secs: parse_or("ENGINE_STALENESS_SECS", defaults.staleness_secs),
            signal_max_age_secs: parse_or("ENGINE_SIGNAL_MAX_AGE_SECS", defaults.signal_max_age_secs),
            dedup_ttl_secs: parse_or("ENGINE_DEDUP_TTL_SECS", defaults.dedup_ttl_secs),
            dedup_capacity: parse_or("ENGINE_DEDUP_CAPACITY", defaults.dedup_capacity),
            price_cooldown_secs: parse_or("ENGINE_PRICE_COOLDOWN_SECS", defaults.price_cooldown_secs),
            drain_timeout_secs: parse_or("ENGINE_DRAIN_TIMEOUT_SECS", defaults.drain_timeout_secs),
            dedup_use_redis: env_or_default("REDIS_HOST", "").trim().len() > 0
                && super::env::env_is_true("ENGINE_DEDUP_USE_REDIS", false),
        }
    }

    /// 实际分片数：0 表示跟随可用并行度
    pub fn effective_stripe_count(&self) -> usize {
        if self.stripe_count > 0 {
            return self.stripe_count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert!(cfg.queue_capacity > 0);
        assert!(cfg.effective_stripe_count() >= 1);
        assert_eq!(cfg.signal_max_age_secs, 30);
        assert_eq!(cfg.staleness_secs, 3600);
    }
}

//! 实例定位器
//!
//! 启用中的策略实例注册于此，按 InstanceKey 精确定位或按交易对批量定位。
//! 启动时从策略配置装载，策略停用时移除。

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::trading::domain::StrategyInstance;
use crate::trading::executor::InstanceKey;

pub struct InstanceLocator {
    instances: DashMap<InstanceKey, Arc<StrategyInstance>>,
}

impl Default for InstanceLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceLocator {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
        }
    }

    pub fn register(&self, instance: StrategyInstance) {
        let key = instance.key;
        self.instances.insert(key, Arc::new(instance));
        info!("注册策略实例: key={}", key);
    }

    pub fn remove(&self, key: &InstanceKey) -> Option<Arc<StrategyInstance>> {
        let removed = self.instances.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            info!("移除策略实例: key={}", key);
        }
        removed
    }

    pub fn find(&self, key: &InstanceKey) -> Option<Arc<StrategyInstance>> {
        self.instances.get(key).map(|v| Arc::clone(&v))
    }

    /// 该交易对下的全部实例
    ///
    /// 指标/K线触发不按订阅过滤，已知的待优化点，不影响正确性。
    pub fn find_by_pair(&self, trading_pair_id: i64) -> Vec<Arc<StrategyInstance>> {
        self.instances
            .iter()
            .filter(|entry| entry.key().trading_pair_id() == trading_pair_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

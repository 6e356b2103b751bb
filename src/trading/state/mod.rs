//! 运行时状态机
//!
//! 每个实例一份内存态（阶段、方向、数量、均价、最近事件时间）加一份持久化镜像。
//! 调度核心不驱动阶段迁移（由下游成交确认环节负责），只在四元组内容哈希
//! 变化时落库，高频触发不产生写放大。内存态仅由持有该实例的分片工作者改写，
//! 串行所有权代替互斥锁。

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::trading::context::snapshot::{
    LogicStateSnapshot, ParamSnapshot, PriceSnapshot, SignalSnapshot,
};
use crate::trading::context::DecisionReadStore;
use crate::trading::executor::InstanceKey;

/// 状态持久化写入口
///
/// 底层存储按实例 id 维度 upsert，必须容忍不同分片对不同实例的并发写。
#[async_trait]
pub trait StateWriteStore: Send + Sync {
    async fn upsert_logic_state(
        &self,
        key: &InstanceKey,
        snapshot: &LogicStateSnapshot,
        state_hash: &str,
    ) -> Result<()>;
}

struct RuntimeState {
    snapshot: LogicStateSnapshot,
    /// 仅存内存，不落库
    last_event_time: Option<DateTime<Utc>>,
    last_persisted_hash: Option<u64>,
}

/// 四元组 (phase, side, qty, avg_entry) 的内容哈希，变更检测用
pub fn content_hash(snapshot: &LogicStateSnapshot) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    snapshot.phase.as_str().hash(&mut hasher);
    snapshot.position_side.as_str().hash(&mut hasher);
    snapshot.position_qty.to_bits().hash(&mut hasher);
    snapshot.avg_entry_price.map(f64::to_bits).hash(&mut hasher);
    hasher.finish()
}

pub struct RuntimeStateManager {
    states: DashMap<InstanceKey, RuntimeState>,
    store: Arc<dyn StateWriteStore>,
}

impl RuntimeStateManager {
    pub fn new(store: Arc<dyn StateWriteStore>) -> Self {
        Self {
            states: DashMap::new(),
            store,
        }
    }

    /// 启动装载：已有持久化状态的实例以其为准，否则落初始态
    ///
    /// 装载来源视为已持久化，哈希对齐，避免启动后的首次无变化触发再写一遍。
    pub fn seed(&self, key: InstanceKey, snapshot: Option<LogicStateSnapshot>) {
        let (snapshot, persisted) = match snapshot {
            Some(s) => {
                let hash = content_hash(&s);
                (s, Some(hash))
            }
            None => (LogicStateSnapshot::initial(), None),
        };
        self.states.insert(
            key,
            RuntimeState {
                snapshot,
                last_event_time: None,
                last_persisted_hash: persisted,
            },
        );
    }

    pub fn remove(&self, key: &InstanceKey) {
        self.states.remove(key);
    }

    /// 当前内存态，未装载的实例按初始态返回
    pub fn current(&self, key: &InstanceKey) -> LogicStateSnapshot {
        self.states
            .get(key)
            .map(|s| s.snapshot.clone())
            .unwrap_or_else(LogicStateSnapshot::initial)
    }

    pub fn current_opt(&self, key: &InstanceKey) -> Option<LogicStateSnapshot> {
        self.states.get(key).map(|s| s.snapshot.clone())
    }

    pub fn last_event_time(&self, key: &InstanceKey) -> Option<DateTime<Utc>> {
        self.states.get(key).and_then(|s| s.last_event_time)
    }

    /// 每处理完一次触发更新最近事件时间（仅内存）
    pub fn note_event(&self, key: &InstanceKey, event_time: DateTime<Utc>) {
        let mut entry = self.states.entry(*key).or_insert_with(|| RuntimeState {
            snapshot: LogicStateSnapshot::initial(),
            last_event_time: None,
            last_persisted_hash: None,
        });
        match entry.last_event_time {
            Some(last) if last >= event_time => {}
            _ => entry.last_event_time = Some(event_time),
        }
    }

    /// 外部（成交确认环节）更新后的状态回写
    ///
    /// 重算内容哈希，与上次落库哈希一致则跳过写库。落库失败只记日志，
    /// 哈希保持旧值，下次更新会再次尝试。
    pub async fn apply_external_update(&self, key: &InstanceKey, snapshot: LogicStateSnapshot) {
        let new_hash = content_hash(&snapshot);
        let need_persist = {
            let mut entry = self.states.entry(*key).or_insert_with(|| RuntimeState {
                snapshot: LogicStateSnapshot::initial(),
                last_event_time: None,
                last_persisted_hash: None,
            });
            entry.snapshot = snapshot.clone();
            entry.last_persisted_hash != Some(new_hash)
        };

        if !need_persist {
            debug!("状态四元组未变化，跳过落库: key={}", key);
            return;
        }

        let hash_str = format!("{:016x}", new_hash);
        match self.store.upsert_logic_state(key, &snapshot, &hash_str).await {
            Ok(()) => {
                if let Some(mut entry) = self.states.get_mut(key) {
                    entry.last_persisted_hash = Some(new_hash);
                }
                info!(
                    "实例状态已落库: key={}, phase={}, side={}, qty={}",
                    key,
                    snapshot.phase.as_str(),
                    snapshot.position_side.as_str(),
                    snapshot.position_qty
                );
            }
            Err(e) => {
                error!("实例状态落库失败（下次更新重试）: key={}, err={}", key, e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// 内存优先的采样读取口
///
/// 逻辑状态以运行时内存态为准（分片串行所有权保证其新鲜），
/// 其余读取透传给底层存储。
pub struct StateAwareReadStore {
    inner: Arc<dyn DecisionReadStore>,
    runtime: Arc<RuntimeStateManager>,
}

impl StateAwareReadStore {
    pub fn new(inner: Arc<dyn DecisionReadStore>, runtime: Arc<RuntimeStateManager>) -> Self {
        Self { inner, runtime }
    }
}

#[async_trait]
impl DecisionReadStore for StateAwareReadStore {
    async fn read_logic_state(&self, key: &InstanceKey) -> Result<Option<LogicStateSnapshot>> {
        if let Some(snapshot) = self.runtime.current_opt(key) {
            return Ok(Some(snapshot));
        }
        self.inner.read_logic_state(key).await
    }

    async fn read_params(&self, strategy_id: i64) -> Result<Option<ParamSnapshot>> {
        self.inner.read_params(strategy_id).await
    }

    async fn read_latest_active_signal(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> Result<Option<SignalSnapshot>> {
        self.inner
            .read_latest_active_signal(strategy_id, trading_pair_id)
            .await
    }

    async fn read_latest_price(&self, trading_pair_id: i64) -> Result<Option<PriceSnapshot>> {
        self.inner.read_latest_price(trading_pair_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::domain::{LogicPhase, PositionSide};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl StateWriteStore for CountingStore {
        async fn upsert_logic_state(
            &self,
            _key: &InstanceKey,
            _snapshot: &LogicStateSnapshot,
            _state_hash: &str,
        ) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn opened(qty: f64) -> LogicStateSnapshot {
        LogicStateSnapshot {
            phase: LogicPhase::Opened,
            position_side: PositionSide::Long,
            position_qty: qty,
            avg_entry_price: Some(100.0),
        }
    }

    #[tokio::test]
    async fn test_same_tuple_twice_writes_once() {
        let store = Arc::new(CountingStore {
            writes: AtomicUsize::new(0),
        });
        let manager = RuntimeStateManager::new(store.clone());
        let key = InstanceKey::new(1, 2).unwrap();

        manager.apply_external_update(&key, opened(1.5)).await;
        manager.apply_external_update(&key, opened(1.5)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        manager.apply_external_update(&key, opened(2.0)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_seed_from_persisted_skips_first_identical_write() {
        let store = Arc::new(CountingStore {
            writes: AtomicUsize::new(0),
        });
        let manager = RuntimeStateManager::new(store.clone());
        let key = InstanceKey::new(1, 2).unwrap();

        manager.seed(key, Some(opened(1.5)));
        manager.apply_external_update(&key, opened(1.5)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_note_event_keeps_latest() {
        let store = Arc::new(CountingStore {
            writes: AtomicUsize::new(0),
        });
        let manager = RuntimeStateManager::new(store);
        let key = InstanceKey::new(1, 2).unwrap();
        let t1 = Utc::now();
        let t0 = t1 - chrono::Duration::seconds(10);

        manager.note_event(&key, t1);
        manager.note_event(&key, t0);
        assert_eq!(manager.last_event_time(&key), Some(t1));
    }

    #[test]
    fn test_content_hash_sensitive_to_each_field() {
        let base = opened(1.5);
        let h = content_hash(&base);

        let mut changed = base.clone();
        changed.position_qty = 1.6;
        assert_ne!(content_hash(&changed), h);

        let mut changed = base.clone();
        changed.phase = LogicPhase::PartialExit;
        assert_ne!(content_hash(&changed), h);

        let mut changed = base;
        changed.avg_entry_price = None;
        assert_ne!(content_hash(&changed), h);
    }
}

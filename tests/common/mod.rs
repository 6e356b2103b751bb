//! 集成测试共用的内存假存储与装配辅助

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use quant_decision::app::bootstrap::{build_engine, DecisionEngine};
use quant_decision::app_config::engine::EngineConfig;
use quant_decision::trading::context::snapshot::{
    LogicStateSnapshot, ParamSnapshot, PriceSnapshot, SignalSnapshot,
};
use quant_decision::trading::context::DecisionReadStore;
use quant_decision::trading::executor::InstanceKey;
use quant_decision::trading::recorder::{IntentRecord, IntentWriteStore};
use quant_decision::trading::state::StateWriteStore;

#[derive(Default)]
pub struct MemoryStore {
    pub params: Mutex<HashMap<i64, ParamSnapshot>>,
    pub signals: Mutex<HashMap<(i64, i64), SignalSnapshot>>,
    pub prices: Mutex<HashMap<i64, PriceSnapshot>>,
    pub logic_states: Mutex<HashMap<(i64, i64), LogicStateSnapshot>>,
    pub intents: Mutex<Vec<IntentRecord>>,
    pub state_writes: AtomicUsize,
    /// 注入故障：读取该策略参数时 panic，隔离性测试用
    pub panic_on_params: Mutex<Option<i64>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_params(&self, strategy_id: i64, param: ParamSnapshot) {
        self.params.lock().unwrap().insert(strategy_id, param);
    }

    pub fn intent_count(&self) -> usize {
        self.intents.lock().unwrap().len()
    }

    pub fn intents_for(&self, strategy_id: i64) -> Vec<IntentRecord> {
        self.intents
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.strategy_id == strategy_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DecisionReadStore for MemoryStore {
    async fn read_logic_state(&self, key: &InstanceKey) -> Result<Option<LogicStateSnapshot>> {
        Ok(self
            .logic_states
            .lock()
            .unwrap()
            .get(&(key.strategy_id(), key.trading_pair_id()))
            .cloned())
    }

    async fn read_params(&self, strategy_id: i64) -> Result<Option<ParamSnapshot>> {
        if *self.panic_on_params.lock().unwrap() == Some(strategy_id) {
            panic!("注入的参数读取故障: strategy_id={}", strategy_id);
        }
        Ok(self.params.lock().unwrap().get(&strategy_id).cloned())
    }

    async fn read_latest_active_signal(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> Result<Option<SignalSnapshot>> {
        Ok(self
            .signals
            .lock()
            .unwrap()
            .get(&(strategy_id, trading_pair_id))
            .cloned())
    }

    async fn read_latest_price(&self, trading_pair_id: i64) -> Result<Option<PriceSnapshot>> {
        Ok(self.prices.lock().unwrap().get(&trading_pair_id).cloned())
    }
}

#[async_trait]
impl StateWriteStore for MemoryStore {
    async fn upsert_logic_state(
        &self,
        key: &InstanceKey,
        snapshot: &LogicStateSnapshot,
        _state_hash: &str,
    ) -> Result<()> {
        self.state_writes.fetch_add(1, Ordering::SeqCst);
        self.logic_states
            .lock()
            .unwrap()
            .insert((key.strategy_id(), key.trading_pair_id()), snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl IntentWriteStore for MemoryStore {
    async fn append_intent_record(&self, record: &IntentRecord) -> Result<()> {
        self.intents.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// 小分片数、小队列的测试引擎
pub fn test_engine(store: &Arc<MemoryStore>) -> DecisionEngine {
    let cfg = EngineConfig {
        stripe_count: 4,
        queue_capacity: 64,
        router_queue_capacity: 256,
        router_workers: 2,
        ..EngineConfig::default()
    };
    build_engine(
        &cfg,
        Arc::clone(store) as Arc<dyn DecisionReadStore>,
        Arc::clone(store) as Arc<dyn StateWriteStore>,
        Arc::clone(store) as Arc<dyn IntentWriteStore>,
    )
}

/// 轮询等待条件成立，超时 panic
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("等待超时: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

//! 数据库读写口实现
//!
//! 把采样器、状态机、记录器依赖的抽象口落到 rbatis 实体模型上，
//! 并负责实体与快照之间的转换。

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use super::market_price::MarketPriceEntityModel;
use super::strategy_config::StrategyConfigEntityModel;
use super::strategy_intent_record::{StrategyIntentRecordEntity, StrategyIntentRecordEntityModel};
use super::strategy_logic_state::{StrategyLogicStateEntity, StrategyLogicStateEntityModel};
use super::strategy_signal::StrategySignalEntityModel;
use crate::trading::context::snapshot::{
    LogicStateSnapshot, ParamSnapshot, PriceSnapshot, SignalSnapshot,
};
use crate::trading::context::DecisionReadStore;
use crate::trading::domain::{LogicPhase, PositionSide, SignalDirection, StrategyKind};
use crate::trading::executor::InstanceKey;
use crate::trading::recorder::{IntentRecord, IntentWriteStore};
use crate::trading::state::StateWriteStore;

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

pub struct DbDecisionStore;

impl Default for DbDecisionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DbDecisionStore {
    pub fn new() -> Self {
        Self
    }

    /// 按策略 id 查声明的策略类型，装载实例用
    pub async fn read_strategy_kind(&self, strategy_id: i64) -> Result<Option<StrategyKind>> {
        let config = StrategyConfigEntityModel::new().get_by_id(strategy_id).await?;
        Ok(config.map(|c| StrategyKind::from_type_str(&c.strategy_type)))
    }
}

#[async_trait]
impl DecisionReadStore for DbDecisionStore {
    async fn read_logic_state(&self, key: &InstanceKey) -> Result<Option<LogicStateSnapshot>> {
        let entity = StrategyLogicStateEntityModel::new()
            .get_by_instance(key.strategy_id(), key.trading_pair_id())
            .await?;
        Ok(entity.map(|e| {
            let phase = LogicPhase::from_str(&e.phase).unwrap_or_else(|| {
                warn!("未识别的持久化阶段值，按IDLE处理: key={}, phase={}", key, e.phase);
                LogicPhase::Idle
            });
            let position_side = PositionSide::from_str(&e.position_side).unwrap_or_else(|| {
                warn!(
                    "未识别的持久化方向值，按FLAT处理: key={}, side={}",
                    key, e.position_side
                );
                PositionSide::Flat
            });
            LogicStateSnapshot {
                phase,
                position_side,
                position_qty: e.position_qty,
                avg_entry_price: e.avg_entry_price,
            }
        }))
    }

    async fn read_params(&self, strategy_id: i64) -> Result<Option<ParamSnapshot>> {
        let config = StrategyConfigEntityModel::new().get_by_id(strategy_id).await?;
        let config = match config {
            Some(c) => c,
            None => return Ok(None),
        };
        match serde_json::from_str::<ParamSnapshot>(&config.params_json) {
            Ok(mut param) => {
                param.raw_json = Some(config.params_json);
                Ok(Some(param))
            }
            Err(e) => {
                // 参数损坏视同缺失，决策逻辑会以 HOLD 收场
                warn!("策略参数解析失败: strategy_id={}, err={}", strategy_id, e);
                Ok(None)
            }
        }
    }

    async fn read_latest_active_signal(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> Result<Option<SignalSnapshot>> {
        let entity = StrategySignalEntityModel::new()
            .get_latest_active(strategy_id, trading_pair_id)
            .await?;
        Ok(entity.and_then(|e| {
            let direction = match SignalDirection::from_str(&e.intent_direction) {
                Some(d) => d,
                None => {
                    warn!(
                        "未识别的信号方向，忽略该信号: strategy_id={}, direction={}",
                        strategy_id, e.intent_direction
                    );
                    return None;
                }
            };
            Some(SignalSnapshot {
                signal_intent_id: e.signal_intent_id,
                signal_id: e.signal_id,
                intent_direction: direction,
                active: e.status == "ACTIVE",
                activated_at: millis_to_datetime(e.activated_at),
                expire_at: e.expire_at.map(millis_to_datetime),
            })
        }))
    }

    async fn read_latest_price(&self, trading_pair_id: i64) -> Result<Option<PriceSnapshot>> {
        let entity = MarketPriceEntityModel::new().get_by_pair(trading_pair_id).await?;
        Ok(entity.map(|e| PriceSnapshot {
            last: e.last_price,
            ts: millis_to_datetime(e.ts),
        }))
    }
}

#[async_trait]
impl StateWriteStore for DbDecisionStore {
    async fn upsert_logic_state(
        &self,
        key: &InstanceKey,
        snapshot: &LogicStateSnapshot,
        state_hash: &str,
    ) -> Result<()> {
        let entity = StrategyLogicStateEntity {
            id: None,
            strategy_id: key.strategy_id(),
            trading_pair_id: key.trading_pair_id(),
            phase: snapshot.phase.as_str().to_string(),
            position_side: snapshot.position_side.as_str().to_string(),
            position_qty: snapshot.position_qty,
            avg_entry_price: snapshot.avg_entry_price,
            state_hash: state_hash.to_string(),
            updated_at: Utc::now().timestamp_millis(),
        };
        StrategyLogicStateEntityModel::new().upsert(entity).await
    }
}

#[async_trait]
impl IntentWriteStore for DbDecisionStore {
    async fn append_intent_record(&self, record: &IntentRecord) -> Result<()> {
        let entity = StrategyIntentRecordEntity {
            id: None,
            decision_id: record.decision_id.clone(),
            user_id: record.user_id,
            strategy_id: record.strategy_id,
            trading_pair_id: record.trading_pair_id,
            signal_intent_id: record.signal_intent_id,
            action: record.action.clone(),
            order_qty: record.order_qty,
            reason_json: record.reason_json.clone(),
            created_at: record.created_at.timestamp_millis(),
        };
        StrategyIntentRecordEntityModel::new().append(entity).await?;
        Ok(())
    }
}

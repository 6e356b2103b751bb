//! 决策上下文
//!
//! 单次决策的全部输入在一次采样中装配完成，决策逻辑内部不允许回读

pub mod sampler;
pub mod snapshot;
pub mod store;

use chrono::{DateTime, Utc};

use crate::trading::domain::{StrategyKind, TriggerKind};

pub use sampler::AtomicContextSampler;
pub use snapshot::{
    BarSnapshot, IndicatorSnapshot, LogicStateSnapshot, ParamSnapshot, PriceSnapshot,
    SignalSnapshot,
};
pub use store::DecisionReadStore;

/// 决策上下文（一次性、不可变）
///
/// 四个数据快照任意一个都可能缺失，有效性校验延迟到决策逻辑内做，
/// 缺失等价于"条件不满足"，绝不是异常。
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub user_id: i64,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub strategy_kind: StrategyKind,

    pub trigger_kind: TriggerKind,
    pub trigger_source: String,
    pub trigger_time: DateTime<Utc>,
    pub sampled_at: DateTime<Utc>,

    pub logic_state_before: LogicStateSnapshot,
    pub param: Option<ParamSnapshot>,

    pub signal: Option<SignalSnapshot>,
    pub indicator: Option<IndicatorSnapshot>,
    pub bar: Option<BarSnapshot>,
    pub price: Option<PriceSnapshot>,
}

impl DecisionContext {
    pub fn is_flat(&self) -> bool {
        self.logic_state_before.is_flat()
    }
}

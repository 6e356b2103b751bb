//! 采样读取接口
//!
//! 采样器只依赖这组异步读取口，生产实现落在 model 层，测试用内存假实现替换

use anyhow::Result;
use async_trait::async_trait;

use super::snapshot::{LogicStateSnapshot, ParamSnapshot, PriceSnapshot, SignalSnapshot};
use crate::trading::executor::InstanceKey;

#[async_trait]
pub trait DecisionReadStore: Send + Sync {
    /// 读取实例的持久化逻辑状态，不存在时返回 None（由调用方落初始态）
    async fn read_logic_state(&self, key: &InstanceKey) -> Result<Option<LogicStateSnapshot>>;

    /// 即时读取策略参数，不走任何缓存
    async fn read_params(&self, strategy_id: i64) -> Result<Option<ParamSnapshot>>;

    /// 读取该实例最近一条激活中的信号
    async fn read_latest_active_signal(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> Result<Option<SignalSnapshot>>;

    /// 读取交易对最新价格
    async fn read_latest_price(&self, trading_pair_id: i64) -> Result<Option<PriceSnapshot>>;
}

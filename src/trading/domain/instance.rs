use chrono::{DateTime, Utc};

use crate::trading::domain::StrategyKind;
use crate::trading::executor::InstanceKey;

/// 策略实例
///
/// 一个启用中的策略绑定一个交易对。启动时从策略配置装载，
/// 策略停用时从定位器移除，进程生命周期内只读。
#[derive(Debug, Clone)]
pub struct StrategyInstance {
    pub key: InstanceKey,
    pub user_id: i64,
    pub strategy_kind: StrategyKind,
    pub created_at: DateTime<Utc>,
}

impl StrategyInstance {
    pub fn new(key: InstanceKey, user_id: i64, strategy_kind: StrategyKind) -> Self {
        Self {
            key,
            user_id,
            strategy_kind,
            created_at: Utc::now(),
        }
    }
}

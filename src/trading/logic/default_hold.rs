//! 兜底逻辑：永远 HOLD
//!
//! 未注册的策略类型路由到这里，保证决策流程不中断。

use tracing::warn;

use super::result::{DecisionReason, DecisionResult};
use super::StrategyLogic;
use crate::trading::context::DecisionContext;

pub struct DefaultHoldLogic;

impl StrategyLogic for DefaultHoldLogic {
    fn supported_type(&self) -> &str {
        "DEFAULT_HOLD"
    }

    fn decide(&self, ctx: &DecisionContext) -> DecisionResult {
        warn!(
            "策略类型无对应逻辑实现，保持HOLD: strategy_id={}, type={}",
            ctx.strategy_id,
            ctx.strategy_kind.as_str()
        );
        DecisionResult::hold(DecisionReason::hold(
            ctx,
            &format!("未找到策略逻辑实现: {}", ctx.strategy_kind.as_str()),
        ))
    }
}

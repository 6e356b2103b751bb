//! 混合策略逻辑
//!
//! 同时运行信号驱动与指标驱动两个子算法，按参数里的组合模式合并：
//! ANY 任一子算法给出动作即采纳（冲突时信号优先），ALL 两者动作一致才执行。

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::indicator_driven::IndicatorDrivenLogic;
use super::result::{DecisionReason, DecisionResult};
use super::signal_driven::SignalDrivenLogic;
use super::StrategyLogic;
use crate::trading::context::DecisionContext;
use crate::trading::domain::HybridCombineMode;

pub struct HybridLogic {
    signal: SignalDrivenLogic,
    indicator: IndicatorDrivenLogic,
}

impl Default for HybridLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridLogic {
    pub fn new() -> Self {
        Self {
            signal: SignalDrivenLogic,
            indicator: IndicatorDrivenLogic::new(),
        }
    }
}

impl StrategyLogic for HybridLogic {
    fn supported_type(&self) -> &str {
        "HYBRID"
    }

    fn decide(&self, ctx: &DecisionContext) -> DecisionResult {
        debug!(
            "执行混合决策: strategy_id={}, trading_pair_id={}",
            ctx.strategy_id, ctx.trading_pair_id
        );

        let combine_mode = match ctx.param.as_ref() {
            Some(param) => param.combine_mode,
            None => {
                return DecisionResult::hold(DecisionReason::hold(ctx, "策略参数为空"));
            }
        };

        let signal_result = self.signal.decide(ctx);
        let indicator_result = self.indicator.decide(ctx);

        let chosen = match combine_mode {
            HybridCombineMode::Any => {
                if !signal_result.is_hold() {
                    Some(&signal_result)
                } else if !indicator_result.is_hold() {
                    Some(&indicator_result)
                } else {
                    None
                }
            }
            HybridCombineMode::All => {
                if !signal_result.is_hold() && signal_result.action == indicator_result.action {
                    Some(&signal_result)
                } else {
                    None
                }
            }
        };

        let mode_str = match combine_mode {
            HybridCombineMode::Any => "ANY",
            HybridCombineMode::All => "ALL",
        };
        let mut basis = Map::new();
        basis.insert("combineMode".to_string(), json!(mode_str));
        basis.insert(
            "signalAction".to_string(),
            json!(signal_result.action.as_str()),
        );
        basis.insert(
            "indicatorAction".to_string(),
            json!(indicator_result.action.as_str()),
        );
        basis.insert(
            "signalBasis".to_string(),
            Value::Object(signal_result.reason.decision_basis.clone()),
        );
        basis.insert(
            "indicatorBasis".to_string(),
            Value::Object(indicator_result.reason.decision_basis.clone()),
        );

        match chosen {
            Some(result) => {
                basis.insert("action".to_string(), json!(result.action.as_str()));
                let state_change = format!(
                    "组合模式={}, 信号动作={}, 指标动作={}, 最终动作={}",
                    mode_str,
                    signal_result.action.as_str(),
                    indicator_result.action.as_str(),
                    result.action.as_str()
                );
                info!(
                    "混合决策完成: strategy_id={}, trading_pair_id={}, mode={}, action={}, qty={}",
                    ctx.strategy_id,
                    ctx.trading_pair_id,
                    mode_str,
                    result.action.as_str(),
                    result.order_qty
                );
                DecisionResult::action(
                    result.action,
                    result.order_qty,
                    DecisionReason::new(ctx, basis, state_change),
                )
            }
            None => {
                let state_change = format!(
                    "组合模式={}, 信号动作={}, 指标动作={}, 未达成一致保持HOLD",
                    mode_str,
                    signal_result.action.as_str(),
                    indicator_result.action.as_str()
                );
                DecisionResult::hold(DecisionReason::new(ctx, basis, state_change))
            }
        }
    }
}

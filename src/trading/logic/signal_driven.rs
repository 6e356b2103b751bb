//! 信号驱动策略逻辑
//!
//! 空仓时按信号方向开仓，持仓时反向信号平仓/反手。
//! 不考虑指标条件，数量只用 initial_capital × base_order_ratio。

use serde_json::{json, Map};
use tracing::{debug, info};

use super::result::{DecisionReason, DecisionResult};
use super::StrategyLogic;
use crate::trading::context::DecisionContext;
use crate::trading::domain::{IntentAction, PositionSide, SignalDirection};

pub struct SignalDrivenLogic;

impl StrategyLogic for SignalDrivenLogic {
    fn supported_type(&self) -> &str {
        "SIGNAL_DRIVEN"
    }

    fn decide(&self, ctx: &DecisionContext) -> DecisionResult {
        debug!(
            "执行信号驱动决策: strategy_id={}, trading_pair_id={}",
            ctx.strategy_id, ctx.trading_pair_id
        );

        let signal = match ctx.signal.as_ref().filter(|s| s.is_valid_at(ctx.sampled_at)) {
            Some(signal) => signal,
            None => {
                debug!(
                    "信号无效或为空，返回HOLD: strategy_id={}, trading_pair_id={}",
                    ctx.strategy_id, ctx.trading_pair_id
                );
                return DecisionResult::hold(DecisionReason::hold(ctx, "信号无效或为空"));
            }
        };

        let param = match ctx.param.as_ref() {
            Some(param) => param,
            None => {
                return DecisionResult::hold(DecisionReason::hold(ctx, "策略参数为空"));
            }
        };

        let order_qty = param.calculate_order_qty();
        let is_flat = ctx.is_flat();
        let current_side = ctx.logic_state_before.position_side;
        let action = determine_action(signal.intent_direction, is_flat, current_side);

        let mut basis = Map::new();
        basis.insert("signalDirection".to_string(), json!(signal.intent_direction.as_str()));
        basis.insert("signalIntentId".to_string(), json!(signal.signal_intent_id));
        basis.insert("currentPosition".to_string(), json!(current_side.as_str()));
        basis.insert("isFlat".to_string(), json!(is_flat));
        basis.insert("action".to_string(), json!(action.as_str()));

        let state_change = format!(
            "信号方向={}, 当前状态={}, 决策动作={}",
            signal.intent_direction.as_str(),
            current_side.as_str(),
            action.as_str()
        );
        let reason = DecisionReason::new(ctx, basis, state_change);

        info!(
            "信号驱动决策完成: strategy_id={}, trading_pair_id={}, action={}, qty={}, direction={}",
            ctx.strategy_id,
            ctx.trading_pair_id,
            action.as_str(),
            order_qty,
            signal.intent_direction.as_str()
        );

        DecisionResult::action(action, order_qty, reason)
    }
}

/// 信号方向 × 当前仓位 → 动作
///
/// 空仓：BUY/SELL/REVERSE 一律开仓（REVERSE 空仓时视同开仓）。
/// 持多：SELL/FLAT 平仓，REVERSE 反手。持空对称。其余 HOLD。
fn determine_action(
    direction: SignalDirection,
    is_flat: bool,
    current_side: PositionSide,
) -> IntentAction {
    if is_flat {
        return match direction {
            SignalDirection::Buy | SignalDirection::Sell | SignalDirection::Reverse => {
                IntentAction::Open
            }
            SignalDirection::Flat => IntentAction::Hold,
        };
    }
    match current_side {
        PositionSide::Long => match direction {
            SignalDirection::Sell | SignalDirection::Flat => IntentAction::Close,
            SignalDirection::Reverse => IntentAction::Reverse,
            SignalDirection::Buy => IntentAction::Hold,
        },
        PositionSide::Short => match direction {
            SignalDirection::Buy | SignalDirection::Flat => IntentAction::Close,
            SignalDirection::Reverse => IntentAction::Reverse,
            SignalDirection::Sell => IntentAction::Hold,
        },
        PositionSide::Flat => IntentAction::Hold,
    }
}

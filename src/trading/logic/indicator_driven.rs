//! 指标驱动策略逻辑
//!
//! 空仓时评估入场条件树，持仓时评估出场条件树。
//! 条件被阻断（必要因子缺失）时 HOLD，与"条件为假"的 HOLD 在依据里区分。

use serde_json::{json, Map};
use tracing::{debug, info, warn};

use super::result::{DecisionReason, DecisionResult};
use super::StrategyLogic;
use crate::trading::condition::{ConditionEvaluator, ConditionTree, EvaluationOutcome};
use crate::trading::context::DecisionContext;
use crate::trading::domain::IntentAction;

pub struct IndicatorDrivenLogic {
    evaluator: ConditionEvaluator,
}

impl Default for IndicatorDrivenLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorDrivenLogic {
    pub fn new() -> Self {
        Self {
            evaluator: ConditionEvaluator::new(),
        }
    }
}

impl StrategyLogic for IndicatorDrivenLogic {
    fn supported_type(&self) -> &str {
        "INDICATOR_DRIVEN"
    }

    fn decide(&self, ctx: &DecisionContext) -> DecisionResult {
        debug!(
            "执行指标驱动决策: strategy_id={}, trading_pair_id={}",
            ctx.strategy_id, ctx.trading_pair_id
        );

        let indicator_valid = ctx.indicator.as_ref().map(|i| i.is_valid()).unwrap_or(false);
        if !indicator_valid {
            return DecisionResult::hold(DecisionReason::hold(ctx, "指标快照无效或为空"));
        }
        let param = match ctx.param.as_ref() {
            Some(param) => param,
            None => {
                return DecisionResult::hold(DecisionReason::hold(ctx, "策略参数为空"));
            }
        };

        let is_flat = ctx.is_flat();
        let (condition_json, stage) = if is_flat {
            (param.entry_condition.as_ref(), "入场")
        } else {
            (param.exit_condition.as_ref(), "出场")
        };

        let condition_json = match condition_json {
            Some(value) => value,
            None => {
                return DecisionResult::hold(DecisionReason::hold(
                    ctx,
                    &format!("未配置{}条件", stage),
                ));
            }
        };

        let tree = match ConditionTree::from_json(condition_json) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(
                    "条件配置解析失败: strategy_id={}, stage={}, err={}",
                    ctx.strategy_id, stage, e
                );
                return DecisionResult::hold(DecisionReason::hold(
                    ctx,
                    &format!("{}条件配置解析失败: {}", stage, e),
                ));
            }
        };

        let outcome = self.evaluator.evaluate(&tree, ctx);
        let mut basis = Map::new();
        basis.insert("stage".to_string(), json!(stage));
        basis.insert("ruleHits".to_string(), json!(outcome.hits()));

        match outcome {
            EvaluationOutcome::Blocked { reason, .. } => {
                basis.insert("blocked".to_string(), json!(true));
                basis.insert("blockReason".to_string(), json!(reason));
                debug!(
                    "{}条件评估被阻断: strategy_id={}, reason={}",
                    stage, ctx.strategy_id, reason
                );
                DecisionResult::hold(DecisionReason::new(
                    ctx,
                    basis,
                    format!("{}条件评估被阻断: {}", stage, reason),
                ))
            }
            EvaluationOutcome::Unsatisfied { .. } => {
                basis.insert("satisfied".to_string(), json!(false));
                DecisionResult::hold(DecisionReason::new(
                    ctx,
                    basis,
                    format!("{}条件未满足", stage),
                ))
            }
            EvaluationOutcome::Satisfied { .. } => {
                basis.insert("satisfied".to_string(), json!(true));
                let (action, order_qty) = if is_flat {
                    (IntentAction::Open, param.calculate_order_qty())
                } else {
                    (IntentAction::Close, ctx.logic_state_before.position_qty)
                };
                basis.insert("action".to_string(), json!(action.as_str()));
                info!(
                    "指标驱动决策完成: strategy_id={}, trading_pair_id={}, action={}, qty={}",
                    ctx.strategy_id,
                    ctx.trading_pair_id,
                    action.as_str(),
                    order_qty
                );
                let state_change = format!(
                    "{}条件满足, 当前状态={}, 决策动作={}",
                    stage,
                    ctx.logic_state_before.position_side.as_str(),
                    action.as_str()
                );
                DecisionResult::action(action, order_qty, DecisionReason::new(ctx, basis, state_change))
            }
        }
    }
}

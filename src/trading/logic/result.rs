use serde_json::{Map, Value};

use crate::trading::context::DecisionContext;
use crate::trading::domain::IntentAction;

/// 决策原因
///
/// 结构化依据，落库时由记录器展开成固定形状的审计 JSON，绝不只存自由文本
#[derive(Debug, Clone)]
pub struct DecisionReason {
    pub trigger_type: String,
    pub trigger_source: String,
    pub trigger_timestamp: String,
    pub decision_basis: Map<String, Value>,
    pub state_change: String,
}

impl DecisionReason {
    pub fn new(ctx: &DecisionContext, decision_basis: Map<String, Value>, state_change: String) -> Self {
        Self {
            trigger_type: ctx.trigger_kind.as_str().to_string(),
            trigger_source: ctx.trigger_source.clone(),
            trigger_timestamp: ctx.trigger_time.to_rfc3339(),
            decision_basis,
            state_change,
        }
    }

    /// HOLD 原因的快捷构造
    pub fn hold(ctx: &DecisionContext, why: &str) -> Self {
        let mut basis = Map::new();
        basis.insert("reason".to_string(), Value::String(why.to_string()));
        Self::new(ctx, basis, "保持当前状态".to_string())
    }
}

/// 决策结果：HOLD 或带数量的动作
#[derive(Debug, Clone)]
pub struct DecisionResult {
    pub action: IntentAction,
    pub order_qty: f64,
    pub reason: DecisionReason,
}

impl DecisionResult {
    pub fn hold(reason: DecisionReason) -> Self {
        Self {
            action: IntentAction::Hold,
            order_qty: 0.0,
            reason,
        }
    }

    pub fn action(action: IntentAction, order_qty: f64, reason: DecisionReason) -> Self {
        Self {
            action,
            order_qty,
            reason,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == IntentAction::Hold
    }
}

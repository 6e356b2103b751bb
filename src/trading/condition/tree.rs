use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::operator::Operator;
use super::typed_value::TypedValue;

/// 条件规则
///
/// 右值二选一：字面量 value 或引用另一个因子的 value_factor。
/// nullable=true 时左因子缺失按不命中处理，否则缺失会 block 整棵树。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRule {
    pub factor: String,
    pub op: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<TypedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_factor: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

/// 组合模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionMode {
    #[default]
    All,
    Any,
}

/// 条件树：规则与嵌套子组按 mode 组合
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConditionTree {
    #[serde(default)]
    pub mode: ConditionMode,
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
    #[serde(default)]
    pub groups: Vec<ConditionTree>,
}

impl ConditionTree {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).context("条件配置解析失败")
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.groups.is_empty()
    }
}

/// 单条规则的命中明细，进入决策依据供审计回放
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleHit {
    pub factor: String,
    pub op: String,
    pub expected: String,
    pub actual: Option<String>,
    pub hit: bool,
}

/// 条件评估结果
///
/// blocked 与"评估为假"是两种不同结论：前者表示必要因子缺失无法评估
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    Satisfied { hits: Vec<RuleHit> },
    Unsatisfied { hits: Vec<RuleHit> },
    Blocked { reason: String, hits: Vec<RuleHit> },
}

impl EvaluationOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, EvaluationOutcome::Satisfied { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, EvaluationOutcome::Blocked { .. })
    }

    pub fn hits(&self) -> &[RuleHit] {
        match self {
            EvaluationOutcome::Satisfied { hits } => hits,
            EvaluationOutcome::Unsatisfied { hits } => hits,
            EvaluationOutcome::Blocked { hits, .. } => hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tree_from_json() {
        let value = json!({
            "mode": "ALL",
            "rules": [
                {"factor": "IND.RSI_14", "op": "LT", "value": 30, "nullable": false},
                {"factor": "BAR.CLOSE", "op": "GT", "value_factor": "IND.EMA_200"}
            ],
            "groups": []
        });
        let tree = ConditionTree::from_json(&value).unwrap();
        assert_eq!(tree.mode, ConditionMode::All);
        assert_eq!(tree.rules.len(), 2);
        assert_eq!(tree.rules[1].value_factor.as_deref(), Some("IND.EMA_200"));
    }

    #[test]
    fn test_default_mode_is_all() {
        let tree = ConditionTree::from_json(&json!({"rules": []})).unwrap();
        assert_eq!(tree.mode, ConditionMode::All);
        assert!(tree.is_empty());
    }
}

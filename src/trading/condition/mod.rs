//! 条件评估引擎
//!
//! 解析策略配置中的入场/出场条件树，对决策上下文中的因子求值。
//! 必要因子缺失会 block 评估（与"评估为假"严格区分），
//! ANY 模式首个命中即短路。

pub mod factor;
pub mod operator;
pub mod tree;
pub mod typed_value;

pub use factor::FactorResolverRegistry;
pub use operator::Operator;
pub use tree::{ConditionMode, ConditionRule, ConditionTree, EvaluationOutcome, RuleHit};
pub use typed_value::TypedValue;

use crate::trading::context::DecisionContext;

enum RuleOutcome {
    Hit(RuleHit),
    Miss(RuleHit),
    Blocked(String, RuleHit),
}

pub struct ConditionEvaluator {
    factors: FactorResolverRegistry,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {
            factors: FactorResolverRegistry::standard(),
        }
    }

    /// 评估条件树
    ///
    /// 空树永不满足（没有条件就没有动作依据）。
    pub fn evaluate(&self, tree: &ConditionTree, ctx: &DecisionContext) -> EvaluationOutcome {
        if tree.is_empty() {
            return EvaluationOutcome::Unsatisfied { hits: Vec::new() };
        }
        match tree.mode {
            ConditionMode::All => self.eval_all(tree, ctx),
            ConditionMode::Any => self.eval_any(tree, ctx),
        }
    }

    fn eval_all(&self, tree: &ConditionTree, ctx: &DecisionContext) -> EvaluationOutcome {
        let mut hits = Vec::new();
        for rule in &tree.rules {
            match self.eval_rule(rule, ctx) {
                RuleOutcome::Hit(hit) => hits.push(hit),
                RuleOutcome::Miss(hit) => {
                    hits.push(hit);
                    return EvaluationOutcome::Unsatisfied { hits };
                }
                RuleOutcome::Blocked(reason, hit) => {
                    hits.push(hit);
                    return EvaluationOutcome::Blocked { reason, hits };
                }
            }
        }
        for group in &tree.groups {
            match self.evaluate(group, ctx) {
                EvaluationOutcome::Satisfied { hits: sub } => hits.extend(sub),
                EvaluationOutcome::Unsatisfied { hits: sub } => {
                    hits.extend(sub);
                    return EvaluationOutcome::Unsatisfied { hits };
                }
                EvaluationOutcome::Blocked { reason, hits: sub } => {
                    hits.extend(sub);
                    return EvaluationOutcome::Blocked { reason, hits };
                }
            }
        }
        EvaluationOutcome::Satisfied { hits }
    }

    fn eval_any(&self, tree: &ConditionTree, ctx: &DecisionContext) -> EvaluationOutcome {
        let mut hits = Vec::new();
        let mut blocked_reason: Option<String> = None;

        for rule in &tree.rules {
            match self.eval_rule(rule, ctx) {
                RuleOutcome::Hit(hit) => {
                    hits.push(hit);
                    return EvaluationOutcome::Satisfied { hits };
                }
                RuleOutcome::Miss(hit) => hits.push(hit),
                RuleOutcome::Blocked(reason, hit) => {
                    hits.push(hit);
                    blocked_reason.get_or_insert(reason);
                }
            }
        }
        for group in &tree.groups {
            match self.evaluate(group, ctx) {
                EvaluationOutcome::Satisfied { hits: sub } => {
                    hits.extend(sub);
                    return EvaluationOutcome::Satisfied { hits };
                }
                EvaluationOutcome::Unsatisfied { hits: sub } => hits.extend(sub),
                EvaluationOutcome::Blocked { reason, hits: sub } => {
                    hits.extend(sub);
                    blocked_reason.get_or_insert(reason);
                }
            }
        }

        // ANY 下只要有一个命中就赢，都未命中时 blocked 优先于"为假"上报
        match blocked_reason {
            Some(reason) => EvaluationOutcome::Blocked { reason, hits },
            None => EvaluationOutcome::Unsatisfied { hits },
        }
    }

    fn eval_rule(&self, rule: &ConditionRule, ctx: &DecisionContext) -> RuleOutcome {
        let expected_desc = rule
            .value
            .as_ref()
            .map(|v| v.render())
            .or_else(|| rule.value_factor.clone())
            .unwrap_or_default();

        let make_hit = |actual: Option<String>, hit: bool| RuleHit {
            factor: rule.factor.clone(),
            op: rule.op.as_str().to_string(),
            expected: expected_desc.clone(),
            actual,
            hit,
        };

        let left = match self.factors.resolve(ctx, &rule.factor) {
            Ok(Some(v)) => v,
            Ok(None) => {
                if rule.nullable {
                    return RuleOutcome::Miss(make_hit(None, false));
                }
                return RuleOutcome::Blocked(
                    format!("必要因子缺失: {}", rule.factor),
                    make_hit(None, false),
                );
            }
            Err(e) => {
                return RuleOutcome::Blocked(e.to_string(), make_hit(None, false));
            }
        };

        let right = if let Some(value) = &rule.value {
            value.clone()
        } else if let Some(value_factor) = &rule.value_factor {
            match self.factors.resolve(ctx, value_factor) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    if rule.nullable {
                        return RuleOutcome::Miss(make_hit(Some(left.render()), false));
                    }
                    return RuleOutcome::Blocked(
                        format!("必要因子缺失: {}", value_factor),
                        make_hit(Some(left.render()), false),
                    );
                }
                Err(e) => {
                    return RuleOutcome::Blocked(e.to_string(), make_hit(Some(left.render()), false));
                }
            }
        } else {
            return RuleOutcome::Blocked(
                format!("规则缺少比较值: {}", rule.factor),
                make_hit(Some(left.render()), false),
            );
        };

        let hit = rule.op.apply(&left, &right);
        let detail = make_hit(Some(left.render()), hit);
        if hit {
            RuleOutcome::Hit(detail)
        } else {
            RuleOutcome::Miss(detail)
        }
    }
}

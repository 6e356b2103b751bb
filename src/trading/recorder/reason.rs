//! 决策原因的审计序列化
//!
//! 固定形状：trigger / logicStateBefore / snapshots / paramsDigest /
//! decisionBasis / stateChange。序列化失败时退化为精简结构，绝不让落库失败。

use serde_json::{json, Value};
use tracing::warn;

use crate::trading::context::DecisionContext;
use crate::trading::logic::DecisionResult;

fn full_reason(ctx: &DecisionContext, result: &DecisionResult) -> Result<String, serde_json::Error> {
    let reason = &result.reason;
    let state = &ctx.logic_state_before;

    let snapshots = json!({
        "signal": ctx.signal.as_ref().map(|s| json!({
            "signalIntentId": s.signal_intent_id,
            "signalId": s.signal_id,
            "direction": s.intent_direction.as_str(),
            "active": s.active,
            "activatedAt": s.activated_at.to_rfc3339(),
        })),
        "indicator": ctx.indicator.as_ref().map(|i| json!({
            "code": i.indicator_code,
            "version": i.indicator_version,
            "barTime": i.bar_time.to_rfc3339(),
            "values": i.values,
        })),
        "bar": ctx.bar.as_ref().map(|b| json!({
            "timeframe": b.timeframe,
            "closeTime": b.bar_close_time.to_rfc3339(),
            "open": b.open,
            "high": b.high,
            "low": b.low,
            "close": b.close,
            "volume": b.volume,
        })),
        "price": ctx.price.as_ref().map(|p| json!({
            "last": p.last,
            "ts": p.ts.to_rfc3339(),
        })),
    });

    let document = json!({
        "trigger": {
            "type": reason.trigger_type,
            "source": reason.trigger_source,
            "timestamp": reason.trigger_timestamp,
        },
        "logicStateBefore": {
            "phase": state.phase.as_str(),
            "side": state.position_side.as_str(),
            "qty": state.position_qty,
            "avgEntry": state.avg_entry_price,
        },
        "snapshots": snapshots,
        "paramsDigest": ctx.param.as_ref().and_then(|p| p.digest()),
        "decisionBasis": Value::Object(reason.decision_basis.clone()),
        "stateChange": reason.state_change,
    });

    serde_json::to_string(&document)
}

/// 精简兜底结构：只保留触发类型与状态变化描述
fn fallback_reason(result: &DecisionResult) -> String {
    json!({
        "trigger": { "type": result.reason.trigger_type },
        "stateChange": result.reason.state_change,
    })
    .to_string()
}

/// 序列化决策原因为审计 JSON
pub fn serialize_reason(ctx: &DecisionContext, result: &DecisionResult) -> String {
    match full_reason(ctx, result) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                "决策原因序列化失败，使用精简结构: strategy_id={}, err={}",
                ctx.strategy_id, e
            );
            fallback_reason(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::context::snapshot::{LogicStateSnapshot, SignalSnapshot};
    use crate::trading::domain::{IntentAction, SignalDirection, StrategyKind, TriggerKind};
    use crate::trading::logic::DecisionReason;
    use chrono::Utc;

    fn sample_ctx() -> DecisionContext {
        let now = Utc::now();
        DecisionContext {
            user_id: 1,
            strategy_id: 10,
            trading_pair_id: 20,
            strategy_kind: StrategyKind::SignalDriven,
            trigger_kind: TriggerKind::Signal,
            trigger_source: "7".to_string(),
            trigger_time: now,
            sampled_at: now,
            logic_state_before: LogicStateSnapshot::initial(),
            param: None,
            signal: Some(SignalSnapshot {
                signal_intent_id: 7,
                signal_id: 8,
                intent_direction: SignalDirection::Buy,
                active: true,
                activated_at: now,
                expire_at: None,
            }),
            indicator: None,
            bar: None,
            price: None,
        }
    }

    #[test]
    fn test_reason_has_fixed_shape() {
        let ctx = sample_ctx();
        let result = DecisionResult::action(
            IntentAction::Open,
            100.0,
            DecisionReason::hold(&ctx, "测试"),
        );
        let serialized = serialize_reason(&ctx, &result);
        let value: Value = serde_json::from_str(&serialized).unwrap();

        assert_eq!(value["trigger"]["type"], "SIGNAL");
        assert_eq!(value["logicStateBefore"]["phase"], "IDLE");
        assert_eq!(value["snapshots"]["signal"]["direction"], "BUY");
        assert!(value["snapshots"]["indicator"].is_null());
        assert!(value.get("decisionBasis").is_some());
        assert!(value.get("stateChange").is_some());
    }

    #[test]
    fn test_fallback_keeps_trigger_and_state_change() {
        let ctx = sample_ctx();
        let result = DecisionResult::hold(DecisionReason::hold(&ctx, "测试"));
        let fallback = fallback_reason(&result);
        let value: Value = serde_json::from_str(&fallback).unwrap();
        assert_eq!(value["trigger"]["type"], "SIGNAL");
        assert!(value.get("stateChange").is_some());
    }
}

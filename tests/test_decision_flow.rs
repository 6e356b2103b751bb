//! 决策全链路：触发发布 → 路由 → 采样 → 决策 → 意图落库

mod common;

use std::collections::HashMap;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use chrono::Utc;
use serde_json::json;

use common::{test_engine, wait_until, MemoryStore};
use quant_decision::trading::context::snapshot::{LogicStateSnapshot, ParamSnapshot};
use quant_decision::trading::domain::{
    LogicPhase, PositionSide, SignalDirection, StrategyInstance, StrategyKind,
};
use quant_decision::trading::event::{
    BarClosed, IndicatorComputed, SignalIntentActivated, TriggerEvent,
};
use quant_decision::trading::executor::InstanceKey;

fn default_params() -> ParamSnapshot {
    ParamSnapshot {
        initial_capital: Some(1000.0),
        base_order_ratio: Some(0.1),
        ..Default::default()
    }
}

fn signal_event(strategy_id: i64, pair_id: i64, direction: SignalDirection) -> TriggerEvent {
    TriggerEvent::Signal(SignalIntentActivated {
        user_id: 1,
        strategy_id,
        trading_pair_id: pair_id,
        signal_intent_id: strategy_id * 1000 + pair_id,
        signal_id: 1,
        intent_direction: direction,
        activated_at: Utc::now(),
    })
}

fn register(engine: &quant_decision::app::bootstrap::DecisionEngine, strategy_id: i64, pair_id: i64, kind: StrategyKind) -> InstanceKey {
    let key = InstanceKey::new(strategy_id, pair_id).unwrap();
    engine.state.seed(key, None);
    engine
        .locator
        .register(StrategyInstance::new(key, 1, kind));
    key
}

/// 场景1：空仓 + BUY 信号 + 有效参数 → OPEN，数量 = 1000 × 0.1 = 100
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flat_buy_signal_opens_with_qty_100() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 10, 20, StrategyKind::SignalDriven);
    store.put_params(10, default_params());

    engine.publisher().publish(signal_event(10, 20, SignalDirection::Buy));

    wait_until(|| store.intent_count() == 1, 3000, "OPEN意图落库").await;
    let intents = store.intents_for(10);
    assert_eq!(intents[0].action, "OPEN");
    assert_abs_diff_eq!(intents[0].order_qty, 100.0);
    assert_eq!(intents[0].trading_pair_id, 20);
    assert!(intents[0].reason_json.contains("\"trigger\""));
    engine.shutdown().await;
}

/// 场景2：持多 + SELL 信号 → CLOSE
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_long_position_sell_signal_closes() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    let key = register(&engine, 11, 20, StrategyKind::SignalDriven);
    store.put_params(11, default_params());
    engine.state.seed(
        key,
        Some(LogicStateSnapshot {
            phase: LogicPhase::Opened,
            position_side: PositionSide::Long,
            position_qty: 2.0,
            avg_entry_price: Some(50.0),
        }),
    );

    engine.publisher().publish(signal_event(11, 20, SignalDirection::Sell));

    wait_until(|| store.intent_count() == 1, 3000, "CLOSE意图落库").await;
    assert_eq!(store.intents_for(11)[0].action, "CLOSE");
    engine.shutdown().await;
}

/// 场景3：无参数 → HOLD，永不落库
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_missing_params_holds_and_nothing_is_persisted() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 12, 20, StrategyKind::SignalDriven);
    // 故意不放参数

    engine.publisher().publish(signal_event(12, 20, SignalDirection::Buy));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.intent_count(), 0, "HOLD决策不应产生意图记录");
    engine.shutdown().await;
}

/// 场景4：指标驱动，RSI_14 < 30 入场条件，值 25 → OPEN；值缺失 → 阻断不落库
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_indicator_entry_condition() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 13, 30, StrategyKind::IndicatorDriven);
    store.put_params(
        13,
        ParamSnapshot {
            entry_condition: Some(json!({
                "rules": [{"factor": "IND.RSI_14", "op": "LT", "value": 30, "nullable": false}]
            })),
            ..default_params()
        },
    );

    // 缺失所需因子的指标事件：阻断，无记录
    engine.publisher().publish(TriggerEvent::Indicator(IndicatorComputed {
        user_id: 1,
        trading_pair_id: 30,
        indicator_code: "MACD".to_string(),
        indicator_version: 1,
        bar_time: Utc::now(),
        values: HashMap::from([("MACD".to_string(), 0.4)]),
        computed_at: Utc::now(),
    }));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.intent_count(), 0, "阻断评估不应产生意图");

    // RSI 25 命中入场条件
    engine.publisher().publish(TriggerEvent::Indicator(IndicatorComputed {
        user_id: 1,
        trading_pair_id: 30,
        indicator_code: "RSI_14".to_string(),
        indicator_version: 1,
        bar_time: Utc::now(),
        values: HashMap::from([("RSI_14".to_string(), 25.0)]),
        computed_at: Utc::now(),
    }));
    wait_until(|| store.intent_count() == 1, 3000, "指标OPEN意图落库").await;
    assert_eq!(store.intents_for(13)[0].action, "OPEN");
    engine.shutdown().await;
}

/// 未注册策略类型走兜底HOLD，不落库也不报错
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_strategy_type_defaults_to_hold() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(
        &engine,
        14,
        20,
        StrategyKind::Unknown("GRID_MAKER".to_string()),
    );
    store.put_params(14, default_params());

    engine.publisher().publish(signal_event(14, 20, SignalDirection::Buy));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.intent_count(), 0);
    engine.shutdown().await;
}

/// 信号触发未命中实例：记日志后丢弃，引擎继续工作
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_signal_for_stopped_strategy_is_dropped() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 15, 20, StrategyKind::SignalDriven);
    store.put_params(15, default_params());

    // 99 号策略不存在
    engine.publisher().publish(signal_event(99, 20, SignalDirection::Buy));
    engine.publisher().publish(signal_event(15, 20, SignalDirection::Buy));

    wait_until(|| store.intent_count() == 1, 3000, "正常实例的意图落库").await;
    assert_eq!(store.intents_for(15).len(), 1);
    assert!(store.intents_for(99).is_empty());
    engine.shutdown().await;
}

/// 重复的信号意图被去重闸门拦截，只产生一条意图
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_signal_intent_is_deduped() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 16, 20, StrategyKind::SignalDriven);
    store.put_params(16, default_params());

    let event = signal_event(16, 20, SignalDirection::Buy);
    engine.publisher().publish(event.clone());
    engine.publisher().publish(event);

    wait_until(|| store.intent_count() >= 1, 3000, "首条意图落库").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.intent_count(), 1, "重复触发未被去重");
    engine.shutdown().await;
}

/// 过旧的事件被陈旧闸门丢弃
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stale_event_is_dropped() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 17, 20, StrategyKind::SignalDriven);
    store.put_params(17, default_params());

    engine.publisher().publish(TriggerEvent::Signal(SignalIntentActivated {
        user_id: 1,
        strategy_id: 17,
        trading_pair_id: 20,
        signal_intent_id: 170001,
        signal_id: 1,
        intent_direction: SignalDirection::Buy,
        activated_at: Utc::now() - chrono::Duration::hours(2),
    }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.intent_count(), 0, "陈旧事件不应进入决策");
    engine.shutdown().await;
}

/// 场景5：同一交易对的两个实例各自处理两个K线事件，互不干扰
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bar_event_fans_out_to_all_pair_instances() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    let entry_on_close = ParamSnapshot {
        entry_condition: Some(json!({
            "rules": [{"factor": "BAR.CLOSE", "op": "GT", "value": 0, "nullable": false}]
        })),
        ..default_params()
    };
    register(&engine, 21, 40, StrategyKind::IndicatorDriven);
    register(&engine, 22, 40, StrategyKind::IndicatorDriven);
    store.put_params(21, entry_on_close.clone());
    store.put_params(22, entry_on_close);

    let bar = |close_offset: i64| {
        TriggerEvent::Bar(BarClosed {
            trading_pair_id: 40,
            timeframe: "1H".to_string(),
            bar_close_time: Utc::now() - chrono::Duration::seconds(close_offset),
            open: 99.0,
            high: 101.0,
            low: 98.0,
            close: 100.0,
            volume: 1234.0,
            source_count: 3,
            event_time: Utc::now(),
        })
    };
    engine.publisher().publish(bar(60));
    engine.publisher().publish(bar(0));

    // K线触发不携带指标快照，指标驱动逻辑按 HOLD 收场，
    // 两个实例都完整走完触发处理即验证扇出与并行
    let key_a = InstanceKey::new(21, 40).unwrap();
    let key_b = InstanceKey::new(22, 40).unwrap();
    wait_until(
        || {
            engine.state.last_event_time(&key_a).is_some()
                && engine.state.last_event_time(&key_b).is_some()
        },
        3000,
        "两个实例都处理完K线触发",
    )
    .await;
    assert_eq!(store.intent_count(), 0, "HOLD不应落库");
    engine.shutdown().await;
}

/// 隔离性：一个实例的决策任务 panic，不妨碍另一实例正常出意图
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_instance_failure_is_invisible_to_others() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    register(&engine, 31, 50, StrategyKind::SignalDriven);
    register(&engine, 32, 51, StrategyKind::SignalDriven);
    store.put_params(31, default_params());
    store.put_params(32, default_params());
    *store.panic_on_params.lock().unwrap() = Some(31);

    engine.publisher().publish(signal_event(31, 50, SignalDirection::Buy));
    engine.publisher().publish(signal_event(32, 51, SignalDirection::Buy));

    wait_until(|| store.intent_count() == 1, 3000, "健康实例的意图落库").await;
    assert_eq!(store.intents_for(32).len(), 1);
    assert!(store.intents_for(31).is_empty());

    // 故障解除后同一实例恢复正常（新的意图 id 避开去重）
    *store.panic_on_params.lock().unwrap() = None;
    engine.publisher().publish(TriggerEvent::Signal(SignalIntentActivated {
        user_id: 1,
        strategy_id: 31,
        trading_pair_id: 50,
        signal_intent_id: 999_001,
        signal_id: 2,
        intent_direction: SignalDirection::Buy,
        activated_at: Utc::now(),
    }));
    wait_until(|| store.intents_for(31).len() == 1, 3000, "故障实例恢复").await;
    engine.shutdown().await;
}

/// 变更检测幂等：同一四元组连续两次外部更新只落库一次
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_state_change_detection_writes_once() {
    let store = MemoryStore::new();
    let engine = test_engine(&store);
    let key = register(&engine, 23, 20, StrategyKind::SignalDriven);

    let opened = LogicStateSnapshot {
        phase: LogicPhase::Opened,
        position_side: PositionSide::Long,
        position_qty: 1.5,
        avg_entry_price: Some(100.0),
    };
    engine.state.apply_external_update(&key, opened.clone()).await;
    engine.state.apply_external_update(&key, opened).await;

    assert_eq!(
        store.state_writes.load(std::sync::atomic::Ordering::SeqCst),
        1,
        "相同四元组重复落库"
    );
    engine.shutdown().await;
}

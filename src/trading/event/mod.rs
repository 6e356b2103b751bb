//! 触发事件定义
//!
//! 四类外部触发，均为不可变值对象并携带逻辑时间戳

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trading::domain::{PriceTriggerKind, SignalDirection, TriggerKind};

/// 信号意图激活事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalIntentActivated {
    pub user_id: i64,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub signal_intent_id: i64,
    pub signal_id: i64,
    pub intent_direction: SignalDirection,
    pub activated_at: DateTime<Utc>,
}

/// 指标计算完成事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorComputed {
    pub user_id: i64,
    pub trading_pair_id: i64,
    pub indicator_code: String,
    pub indicator_version: i32,
    pub bar_time: DateTime<Utc>,
    pub values: HashMap<String, f64>,
    pub computed_at: DateTime<Utc>,
}

/// K线收盘事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarClosed {
    pub trading_pair_id: i64,
    pub timeframe: String,
    pub bar_close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub source_count: i32,
    pub event_time: DateTime<Utc>,
}

/// 价格阈值触发事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTriggered {
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub trigger_type: PriceTriggerKind,
    pub trigger_price: f64,
    pub current_price: f64,
    pub triggered_at: DateTime<Utc>,
}

/// 路由入口的统一事件包装
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    Signal(SignalIntentActivated),
    Indicator(IndicatorComputed),
    Bar(BarClosed),
    Price(PriceTriggered),
}

impl TriggerEvent {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerEvent::Signal(_) => TriggerKind::Signal,
            TriggerEvent::Indicator(_) => TriggerKind::Indicator,
            TriggerEvent::Bar(_) => TriggerKind::Bar,
            TriggerEvent::Price(_) => TriggerKind::Price,
        }
    }

    /// 事件的逻辑时间戳，陈旧过滤按它判断
    pub fn event_time(&self) -> DateTime<Utc> {
        match self {
            TriggerEvent::Signal(e) => e.activated_at,
            TriggerEvent::Indicator(e) => e.computed_at,
            TriggerEvent::Bar(e) => e.event_time,
            TriggerEvent::Price(e) => e.triggered_at,
        }
    }

    pub fn trading_pair_id(&self) -> i64 {
        match self {
            TriggerEvent::Signal(e) => e.trading_pair_id,
            TriggerEvent::Indicator(e) => e.trading_pair_id,
            TriggerEvent::Bar(e) => e.trading_pair_id,
            TriggerEvent::Price(e) => e.trading_pair_id,
        }
    }
}

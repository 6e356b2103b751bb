//! 决策输入快照
//!
//! 每个快照都是采样时刻的一次不可变读取，构造后不再变化，
//! 各自携带有效性判断。缺失用 Option 表达，不是错误。

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trading::domain::{HybridCombineMode, LogicPhase, PositionSide, SignalDirection};

/// 信号快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub signal_intent_id: i64,
    pub signal_id: i64,
    pub intent_direction: SignalDirection,
    pub active: bool,
    pub activated_at: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
}

impl SignalSnapshot {
    /// 信号有效性 = 处于激活状态且在给定时刻未过期
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.expire_at {
            Some(expire) => at < expire,
            None => true,
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub indicator_code: String,
    pub indicator_version: i32,
    pub bar_time: DateTime<Utc>,
    pub values: HashMap<String, f64>,
}

impl IndicatorSnapshot {
    pub fn is_valid(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// K线快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSnapshot {
    pub timeframe: String,
    pub bar_close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl BarSnapshot {
    pub fn is_valid(&self) -> bool {
        self.close > 0.0
    }
}

/// 价格快照
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub last: f64,
    pub ts: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn is_valid(&self) -> bool {
        self.last > 0.0
    }
}

/// 策略参数快照
///
/// 每次决策即时读取，保证决策看到的是当前参数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParamSnapshot {
    pub initial_capital: Option<f64>,
    pub base_order_ratio: Option<f64>,
    pub entry_condition: Option<serde_json::Value>,
    pub exit_condition: Option<serde_json::Value>,
    #[serde(default)]
    pub combine_mode: HybridCombineMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
}

impl ParamSnapshot {
    /// 下单数量 = 初始资金 × 基础下单比例，任一缺失按 0 处理
    pub fn calculate_order_qty(&self) -> f64 {
        match (self.initial_capital, self.base_order_ratio) {
            (Some(capital), Some(ratio)) => capital * ratio,
            _ => 0.0,
        }
    }

    /// 参数指纹，进入决策原因用于审计比对，非加密用途
    pub fn digest(&self) -> Option<String> {
        let raw = self.raw_json.as_ref()?;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        raw.hash(&mut hasher);
        Some(format!("{:016x}", hasher.finish()))
    }
}

/// 决策前逻辑状态快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicStateSnapshot {
    pub phase: LogicPhase,
    pub position_side: PositionSide,
    pub position_qty: f64,
    pub avg_entry_price: Option<f64>,
}

impl LogicStateSnapshot {
    /// 初始状态：空仓待命
    pub fn initial() -> Self {
        Self {
            phase: LogicPhase::Idle,
            position_side: PositionSide::Flat,
            position_qty: 0.0,
            avg_entry_price: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position_side == PositionSide::Flat || self.position_qty <= 0.0
    }
}

use serde::{Deserialize, Serialize};

/// 决策动作
///
/// HOLD 不是意图，只有动作类型的决策才会被落库
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentAction {
    Open,
    Close,
    Add,
    Reduce,
    Reverse,
    Hold,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::Open => "OPEN",
            IntentAction::Close => "CLOSE",
            IntentAction::Add => "ADD",
            IntentAction::Reduce => "REDUCE",
            IntentAction::Reverse => "REVERSE",
            IntentAction::Hold => "HOLD",
        }
    }

    /// 是否为可落库的动作意图
    pub fn is_action_intent(&self) -> bool {
        !matches!(self, IntentAction::Hold)
    }
}

/// 逻辑仓位阶段
///
/// 阶段迁移由下游的成交确认环节驱动，调度核心只读不改
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicPhase {
    Idle,
    OpenPending,
    Opened,
    PartialExit,
    ExitPending,
    AddPending,
    Closed,
}

impl LogicPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicPhase::Idle => "IDLE",
            LogicPhase::OpenPending => "OPEN_PENDING",
            LogicPhase::Opened => "OPENED",
            LogicPhase::PartialExit => "PARTIAL_EXIT",
            LogicPhase::ExitPending => "EXIT_PENDING",
            LogicPhase::AddPending => "ADD_PENDING",
            LogicPhase::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IDLE" => Some(LogicPhase::Idle),
            "OPEN_PENDING" => Some(LogicPhase::OpenPending),
            "OPENED" => Some(LogicPhase::Opened),
            "PARTIAL_EXIT" => Some(LogicPhase::PartialExit),
            "EXIT_PENDING" => Some(LogicPhase::ExitPending),
            "ADD_PENDING" => Some(LogicPhase::AddPending),
            "CLOSED" => Some(LogicPhase::Closed),
            _ => None,
        }
    }

    /// 是否持有仓位（含部分退出、加仓中）
    pub fn is_holding(&self) -> bool {
        matches!(
            self,
            LogicPhase::Opened | LogicPhase::PartialExit | LogicPhase::AddPending
        )
    }
}

/// 逻辑仓位方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
            PositionSide::Flat => "FLAT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LONG" => Some(PositionSide::Long),
            "SHORT" => Some(PositionSide::Short),
            "FLAT" => Some(PositionSide::Flat),
            _ => None,
        }
    }
}

/// 触发来源类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    Signal,
    Indicator,
    Bar,
    Price,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Signal => "SIGNAL",
            TriggerKind::Indicator => "INDICATOR",
            TriggerKind::Bar => "BAR",
            TriggerKind::Price => "PRICE",
        }
    }
}

/// 信号意图方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Buy,
    Sell,
    Flat,
    Reverse,
}

impl SignalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalDirection::Buy => "BUY",
            SignalDirection::Sell => "SELL",
            SignalDirection::Flat => "FLAT",
            SignalDirection::Reverse => "REVERSE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(SignalDirection::Buy),
            "SELL" => Some(SignalDirection::Sell),
            "FLAT" => Some(SignalDirection::Flat),
            "REVERSE" => Some(SignalDirection::Reverse),
            _ => None,
        }
    }
}

/// 价格触发类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceTriggerKind {
    TakeProfit,
    StopLoss,
    Breakout,
}

impl PriceTriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTriggerKind::TakeProfit => "TAKE_PROFIT",
            PriceTriggerKind::StopLoss => "STOP_LOSS",
            PriceTriggerKind::Breakout => "BREAKOUT",
        }
    }
}

/// 策略类型
///
/// 未识别的类型保留原始串，由注册中心兜底为 HOLD 算法
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    SignalDriven,
    IndicatorDriven,
    Hybrid,
    Unknown(String),
}

impl StrategyKind {
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "SIGNAL_DRIVEN" => StrategyKind::SignalDriven,
            "INDICATOR_DRIVEN" => StrategyKind::IndicatorDriven,
            "HYBRID" => StrategyKind::Hybrid,
            other => StrategyKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StrategyKind::SignalDriven => "SIGNAL_DRIVEN",
            StrategyKind::IndicatorDriven => "INDICATOR_DRIVEN",
            StrategyKind::Hybrid => "HYBRID",
            StrategyKind::Unknown(s) => s.as_str(),
        }
    }
}

/// 混合策略的组合模式
///
/// ANY：任一子算法给出动作即采纳，冲突时信号优先；ALL：两者一致才执行
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HybridCombineMode {
    #[default]
    Any,
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_action_hold_is_not_intent() {
        assert!(!IntentAction::Hold.is_action_intent());
        assert!(IntentAction::Open.is_action_intent());
        assert!(IntentAction::Reverse.is_action_intent());
    }

    #[test]
    fn test_phase_round_trip() {
        for phase in [
            LogicPhase::Idle,
            LogicPhase::OpenPending,
            LogicPhase::Opened,
            LogicPhase::PartialExit,
            LogicPhase::ExitPending,
            LogicPhase::AddPending,
            LogicPhase::Closed,
        ] {
            assert_eq!(LogicPhase::from_str(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn test_strategy_kind_unknown_keeps_raw() {
        let kind = StrategyKind::from_type_str("GRID_V2");
        assert_eq!(kind, StrategyKind::Unknown("GRID_V2".to_string()));
        assert_eq!(kind.as_str(), "GRID_V2");
    }
}

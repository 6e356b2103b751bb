//! 原子上下文采样器
//!
//! 一次调用内在同一逻辑时点读齐全部决策输入。触发事件自身携带的数据
//! 直接取自事件载荷（避免写后读竞争），其余输入即时读取，允许缺失。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::snapshot::{
    BarSnapshot, IndicatorSnapshot, LogicStateSnapshot, ParamSnapshot, PriceSnapshot,
    SignalSnapshot,
};
use super::store::DecisionReadStore;
use super::DecisionContext;
use crate::trading::domain::StrategyInstance;
use crate::trading::event::TriggerEvent;

pub struct AtomicContextSampler {
    store: Arc<dyn DecisionReadStore>,
}

impl AtomicContextSampler {
    pub fn new(store: Arc<dyn DecisionReadStore>) -> Self {
        Self { store }
    }

    /// 为一次触发装配决策上下文
    ///
    /// 读取失败一律降级为缺失快照并记录日志，采样自身不产生错误。
    pub async fn sample(
        &self,
        instance: &StrategyInstance,
        event: &TriggerEvent,
    ) -> DecisionContext {
        let key = instance.key;
        let sampled_at = Utc::now();

        let logic_state_before = self.read_state_or_initial(&key).await;
        let param = self.read_params_opt(key.strategy_id()).await;

        let (trigger_source, signal, indicator, bar, price) = match event {
            TriggerEvent::Signal(e) => {
                let signal = SignalSnapshot {
                    signal_intent_id: e.signal_intent_id,
                    signal_id: e.signal_id,
                    intent_direction: e.intent_direction,
                    active: true,
                    activated_at: e.activated_at,
                    expire_at: None,
                };
                let price = self.read_price_opt(key.trading_pair_id()).await;
                (
                    e.signal_intent_id.to_string(),
                    Some(signal),
                    None,
                    None,
                    price,
                )
            }
            TriggerEvent::Indicator(e) => {
                let indicator = IndicatorSnapshot {
                    indicator_code: e.indicator_code.clone(),
                    indicator_version: e.indicator_version,
                    bar_time: e.bar_time,
                    values: e.values.clone(),
                };
                let signal = self.read_signal_opt(&key).await;
                let price = self.read_price_opt(key.trading_pair_id()).await;
                (e.indicator_code.clone(), signal, Some(indicator), None, price)
            }
            TriggerEvent::Bar(e) => {
                let bar = BarSnapshot {
                    timeframe: e.timeframe.clone(),
                    bar_close_time: e.bar_close_time,
                    open: e.open,
                    high: e.high,
                    low: e.low,
                    close: e.close,
                    volume: e.volume,
                };
                let signal = self.read_signal_opt(&key).await;
                let price = self.read_price_opt(key.trading_pair_id()).await;
                (
                    format!("{}@{}", e.timeframe, e.bar_close_time.timestamp_millis()),
                    signal,
                    None,
                    Some(bar),
                    price,
                )
            }
            TriggerEvent::Price(e) => {
                let price = PriceSnapshot {
                    last: e.current_price,
                    ts: e.triggered_at,
                };
                let signal = self.read_signal_opt(&key).await;
                (
                    e.trigger_type.as_str().to_string(),
                    signal,
                    None,
                    None,
                    Some(price),
                )
            }
        };

        debug!(
            "采样完成: key={}, trigger={}, signal={}, indicator={}, bar={}, price={}",
            key,
            event.kind().as_str(),
            signal.is_some(),
            indicator.is_some(),
            bar.is_some(),
            price.is_some()
        );

        DecisionContext {
            user_id: instance.user_id,
            strategy_id: key.strategy_id(),
            trading_pair_id: key.trading_pair_id(),
            strategy_kind: instance.strategy_kind.clone(),
            trigger_kind: event.kind(),
            trigger_source,
            trigger_time: event.event_time(),
            sampled_at,
            logic_state_before,
            param,
            signal,
            indicator,
            bar,
            price,
        }
    }

    async fn read_state_or_initial(
        &self,
        key: &crate::trading::executor::InstanceKey,
    ) -> LogicStateSnapshot {
        match self.store.read_logic_state(key).await {
            Ok(Some(state)) => state,
            Ok(None) => LogicStateSnapshot::initial(),
            Err(e) => {
                warn!("读取逻辑状态失败，按初始态处理: key={}, err={}", key, e);
                LogicStateSnapshot::initial()
            }
        }
    }

    async fn read_params_opt(&self, strategy_id: i64) -> Option<ParamSnapshot> {
        match self.store.read_params(strategy_id).await {
            Ok(param) => param,
            Err(e) => {
                warn!("读取策略参数失败: strategy_id={}, err={}", strategy_id, e);
                None
            }
        }
    }

    async fn read_signal_opt(
        &self,
        key: &crate::trading::executor::InstanceKey,
    ) -> Option<SignalSnapshot> {
        match self
            .store
            .read_latest_active_signal(key.strategy_id(), key.trading_pair_id())
            .await
        {
            Ok(signal) => signal,
            Err(e) => {
                warn!("读取激活信号失败: key={}, err={}", key, e);
                None
            }
        }
    }

    async fn read_price_opt(&self, trading_pair_id: i64) -> Option<PriceSnapshot> {
        match self.store.read_latest_price(trading_pair_id).await {
            Ok(price) => price,
            Err(e) => {
                warn!("读取最新价格失败: trading_pair_id={}, err={}", trading_pair_id, e);
                None
            }
        }
    }
}

//! 决策闸门链
//!
//! 采样与决策逻辑之间的一串廉价筛查，首个拒绝即短路。
//! 闸门拒绝是正常结局：记日志、丢弃，不产生意图记录，也不是错误。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use crate::trading::cache::CacheProvider;
use crate::trading::context::DecisionContext;
use crate::trading::domain::{LogicPhase, PriceTriggerKind};
use crate::trading::event::TriggerEvent;
use crate::trading::state::RuntimeStateManager;

/// 闸门裁决
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Pass,
    Reject { gate: &'static str, reason: String },
}

impl GuardVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, GuardVerdict::Pass)
    }

    fn reject(gate: &'static str, reason: String) -> Self {
        GuardVerdict::Reject { gate, reason }
    }
}

#[async_trait]
pub trait DecisionGuard: Send + Sync {
    fn name(&self) -> &'static str;

    async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict;
}

/// 结构合法性闸门
///
/// 非正 id、空策略类型属于畸形事件，直接拒绝。
pub struct SanityGate;

#[async_trait]
impl DecisionGuard for SanityGate {
    fn name(&self) -> &'static str {
        "sanity"
    }

    async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict {
        if ctx.strategy_id <= 0 || ctx.trading_pair_id <= 0 {
            return GuardVerdict::reject(
                self.name(),
                format!(
                    "非法实例标识: strategy_id={}, trading_pair_id={}",
                    ctx.strategy_id, ctx.trading_pair_id
                ),
            );
        }
        if ctx.strategy_kind.as_str().is_empty() {
            return GuardVerdict::reject(self.name(), "策略类型为空".to_string());
        }
        if let TriggerEvent::Indicator(e) = event {
            if e.indicator_code.is_empty() {
                return GuardVerdict::reject(self.name(), "指标编码为空".to_string());
            }
        }
        GuardVerdict::Pass
    }
}

/// 阶段闸门
///
/// 对当前阶段无意义的触发直接拒绝：挂单确认中的实例不接受新信号，
/// 止盈/止损类价格触发要求实际持仓。
pub struct PhaseGate;

#[async_trait]
impl DecisionGuard for PhaseGate {
    fn name(&self) -> &'static str {
        "phase"
    }

    async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict {
        let phase = ctx.logic_state_before.phase;
        let pending = matches!(
            phase,
            LogicPhase::OpenPending | LogicPhase::ExitPending | LogicPhase::AddPending
        );
        match event {
            TriggerEvent::Signal(_) if pending => GuardVerdict::reject(
                self.name(),
                format!("阶段 {} 下不接受信号触发", phase.as_str()),
            ),
            TriggerEvent::Price(e)
                if matches!(
                    e.trigger_type,
                    PriceTriggerKind::TakeProfit | PriceTriggerKind::StopLoss
                ) && !ctx.logic_state_before.phase.is_holding() =>
            {
                GuardVerdict::reject(
                    self.name(),
                    format!(
                        "阶段 {} 无持仓，忽略 {} 价格触发",
                        phase.as_str(),
                        e.trigger_type.as_str()
                    ),
                )
            }
            _ => GuardVerdict::Pass,
        }
    }
}

/// 陈旧闸门
///
/// 事件时间落后于当前时间或该实例最近一次已处理事件超过阈值即拒绝。
/// 这是尽力而为的过滤，不提供跨触发类型的顺序保证。
pub struct StalenessGate {
    runtime: Arc<RuntimeStateManager>,
    max_age: Duration,
    signal_max_age: Duration,
}

impl StalenessGate {
    pub fn new(runtime: Arc<RuntimeStateManager>, max_age_secs: i64, signal_max_age_secs: i64) -> Self {
        Self {
            runtime,
            max_age: Duration::seconds(max_age_secs),
            signal_max_age: Duration::seconds(signal_max_age_secs),
        }
    }
}

#[async_trait]
impl DecisionGuard for StalenessGate {
    fn name(&self) -> &'static str {
        "staleness"
    }

    async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict {
        let event_time = event.event_time();
        let age = Utc::now() - event_time;

        if age > self.max_age {
            return GuardVerdict::reject(
                self.name(),
                format!("事件过旧: age={}秒", age.num_seconds()),
            );
        }
        if matches!(event, TriggerEvent::Signal(_)) && age > self.signal_max_age {
            return GuardVerdict::reject(
                self.name(),
                format!("信号过期: age={}秒", age.num_seconds()),
            );
        }

        let key = crate::trading::executor::InstanceKey::new(ctx.strategy_id, ctx.trading_pair_id);
        if let Ok(key) = key {
            if let Some(last) = self.runtime.last_event_time(&key) {
                if last - event_time > self.max_age {
                    return GuardVerdict::reject(
                        self.name(),
                        format!(
                            "事件落后于实例最近处理时间: event={}, last={}",
                            event_time.to_rfc3339(),
                            last.to_rfc3339()
                        ),
                    );
                }
            }
        }
        GuardVerdict::Pass
    }
}

/// 去重闸门
///
/// 以触发自身的幂等键查 TTL 缓存，命中即拒绝。价格触发按冷却窗口分桶。
pub struct DedupGate {
    cache: Arc<dyn CacheProvider<String>>,
    ttl_secs: u64,
    price_cooldown_secs: i64,
}

impl DedupGate {
    pub fn new(
        cache: Arc<dyn CacheProvider<String>>,
        ttl_secs: u64,
        price_cooldown_secs: i64,
    ) -> Self {
        Self {
            cache,
            ttl_secs,
            price_cooldown_secs: price_cooldown_secs.max(1),
        }
    }

    fn dedup_key(&self, event: &TriggerEvent, ctx: &DecisionContext) -> String {
        match event {
            TriggerEvent::Signal(e) => {
                format!("sig:{}:{}", ctx.strategy_id, e.signal_intent_id)
            }
            TriggerEvent::Indicator(e) => format!(
                "ind:{}:{}:{}:{}",
                ctx.strategy_id,
                ctx.trading_pair_id,
                e.indicator_code,
                e.bar_time.timestamp_millis()
            ),
            TriggerEvent::Bar(e) => format!(
                "bar:{}:{}:{}:{}",
                ctx.strategy_id,
                ctx.trading_pair_id,
                e.timeframe,
                e.bar_close_time.timestamp_millis()
            ),
            TriggerEvent::Price(e) => {
                let bucket = e.triggered_at.timestamp() / self.price_cooldown_secs;
                format!(
                    "px:{}:{}:{}:{}",
                    ctx.strategy_id,
                    ctx.trading_pair_id,
                    e.trigger_type.as_str(),
                    bucket
                )
            }
        }
    }
}

#[async_trait]
impl DecisionGuard for DedupGate {
    fn name(&self) -> &'static str {
        "dedup"
    }

    async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict {
        let key = self.dedup_key(event, ctx);
        match self.cache.get(&key).await {
            Ok(Some(_)) => {
                return GuardVerdict::reject(self.name(), format!("重复触发: {}", key));
            }
            Ok(None) => {}
            Err(e) => {
                // 缓存故障时放行，去重只是尽力而为
                debug!("去重缓存读取失败，放行: key={}, err={}", key, e);
            }
        }
        if let Err(e) = self.cache.set(&key, &"1".to_string(), Some(self.ttl_secs)).await {
            debug!("去重标记写入失败: key={}, err={}", key, e);
        }
        GuardVerdict::Pass
    }
}

/// 闸门链：按序筛查，首个拒绝即返回
pub struct GuardChain {
    guards: Vec<Box<dyn DecisionGuard>>,
}

impl GuardChain {
    pub fn new(guards: Vec<Box<dyn DecisionGuard>>) -> Self {
        Self { guards }
    }

    /// 空链，单测裸跑决策管线用
    pub fn none() -> Self {
        Self { guards: Vec::new() }
    }

    /// 标准链：结构 → 阶段 → 陈旧 → 去重
    ///
    /// 去重放最后，只有本就会被处理的事件才消耗去重标记。
    pub fn standard(
        runtime: Arc<RuntimeStateManager>,
        dedup_cache: Arc<dyn CacheProvider<String>>,
        max_age_secs: i64,
        signal_max_age_secs: i64,
        dedup_ttl_secs: u64,
        price_cooldown_secs: i64,
    ) -> Self {
        Self::new(vec![
            Box::new(SanityGate),
            Box::new(PhaseGate),
            Box::new(StalenessGate::new(runtime, max_age_secs, signal_max_age_secs)),
            Box::new(DedupGate::new(dedup_cache, dedup_ttl_secs, price_cooldown_secs)),
        ])
    }

    pub async fn screen(&self, event: &TriggerEvent, ctx: &DecisionContext) -> GuardVerdict {
        for guard in &self.guards {
            let verdict = guard.screen(event, ctx).await;
            if let GuardVerdict::Reject { gate, reason } = &verdict {
                debug!(
                    "闸门拒绝: gate={}, strategy_id={}, trading_pair_id={}, reason={}",
                    gate, ctx.strategy_id, ctx.trading_pair_id, reason
                );
                return verdict;
            }
        }
        GuardVerdict::Pass
    }
}

//! 决策流水线
//!
//! 一个分片任务的完整主体：采样 → 闸门筛查 → 决策逻辑 → 意图记录 →
//! 运行时状态更新。任何一步的失败都被消化在本实例内部。

use std::sync::Arc;

use tracing::debug;

use crate::trading::context::AtomicContextSampler;
use crate::trading::domain::StrategyInstance;
use crate::trading::event::TriggerEvent;
use crate::trading::guard::{GuardChain, GuardVerdict};
use crate::trading::logic::StrategyLogicRegistry;
use crate::trading::recorder::IntentRecorder;
use crate::trading::state::RuntimeStateManager;

pub struct DecisionPipeline {
    sampler: AtomicContextSampler,
    guards: GuardChain,
    registry: Arc<StrategyLogicRegistry>,
    recorder: IntentRecorder,
    state: Arc<RuntimeStateManager>,
}

impl DecisionPipeline {
    pub fn new(
        sampler: AtomicContextSampler,
        guards: GuardChain,
        registry: Arc<StrategyLogicRegistry>,
        recorder: IntentRecorder,
        state: Arc<RuntimeStateManager>,
    ) -> Self {
        Self {
            sampler,
            guards,
            registry,
            recorder,
            state,
        }
    }

    /// 处理一次触发
    ///
    /// 始终在该实例所属分片的工作者上串行执行。
    pub async fn process(&self, instance: Arc<StrategyInstance>, event: TriggerEvent) {
        let ctx = self.sampler.sample(&instance, &event).await;

        if let GuardVerdict::Reject { gate, reason } = self.guards.screen(&event, &ctx).await {
            debug!(
                "触发被闸门拦截: key={}, gate={}, reason={}",
                instance.key, gate, reason
            );
            return;
        }

        let logic = self.registry.get_logic(&instance.strategy_kind);
        let result = logic.decide(&ctx);

        self.recorder.record(&ctx, &result).await;
        self.state.note_event(&instance.key, event.event_time());
    }
}

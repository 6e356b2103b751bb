//! 决策事件路由
//!
//! 四类触发各有解析规则：信号/价格精确定位单实例（找不到记日志后丢弃，
//! 信号晚到于已停用的策略是正常情形）；指标/K线广播到交易对下全部实例。
//! 解析出的每个实例构造一个决策任务，按 InstanceKey 提交给分片串行执行器。
//! 路由过程中的一切异常被捕获、记日志、丢弃，绝不外抛。

pub mod channel;
pub mod locator;
pub mod pipeline;

pub use channel::{TriggerChannel, TriggerPublisher};
pub use locator::InstanceLocator;
pub use pipeline::DecisionPipeline;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info};

use crate::trading::domain::StrategyInstance;
use crate::trading::event::TriggerEvent;
use crate::trading::executor::{InstanceKey, StripedSerialExecutor};

pub struct DecisionEventRouter {
    locator: Arc<InstanceLocator>,
    executor: Arc<StripedSerialExecutor>,
    pipeline: Arc<DecisionPipeline>,
}

impl DecisionEventRouter {
    pub fn new(
        locator: Arc<InstanceLocator>,
        executor: Arc<StripedSerialExecutor>,
        pipeline: Arc<DecisionPipeline>,
    ) -> Self {
        Self {
            locator,
            executor,
            pipeline,
        }
    }

    /// 路由一个触发事件
    pub async fn route(&self, event: TriggerEvent) {
        let instances = match self.resolve(&event) {
            Ok(instances) => instances,
            Err(e) => {
                error!("事件解析失败，已丢弃: kind={}, err={}", event.kind().as_str(), e);
                return;
            }
        };

        if instances.is_empty() {
            debug!(
                "事件无可路由实例，已丢弃: kind={}, trading_pair_id={}",
                event.kind().as_str(),
                event.trading_pair_id()
            );
            return;
        }

        for instance in instances {
            let pipeline = Arc::clone(&self.pipeline);
            let event = event.clone();
            let key = instance.key;
            self.executor
                .submit(&key, async move {
                    // 实例级失败隔离：单个决策任务 panic 不得波及其他实例
                    let task = AssertUnwindSafe(pipeline.process(instance, event)).catch_unwind();
                    if task.await.is_err() {
                        error!("决策任务panic，已隔离: key={}", key);
                    }
                })
                .await;
        }
    }

    /// 按触发类型解析受影响实例
    fn resolve(&self, event: &TriggerEvent) -> anyhow::Result<Vec<Arc<StrategyInstance>>> {
        match event {
            TriggerEvent::Signal(e) => {
                let key = InstanceKey::new(e.strategy_id, e.trading_pair_id)?;
                Ok(self.lookup_single(&key, "信号"))
            }
            TriggerEvent::Price(e) => {
                let key = InstanceKey::new(e.strategy_id, e.trading_pair_id)?;
                Ok(self.lookup_single(&key, "价格"))
            }
            TriggerEvent::Indicator(e) => Ok(self.locator.find_by_pair(e.trading_pair_id)),
            TriggerEvent::Bar(e) => Ok(self.locator.find_by_pair(e.trading_pair_id)),
        }
    }

    fn lookup_single(&self, key: &InstanceKey, kind: &str) -> Vec<Arc<StrategyInstance>> {
        match self.locator.find(key) {
            Some(instance) => vec![instance],
            None => {
                // 策略停用后信号/价格触发仍可能到达，属正常情形
                info!("{}触发未命中实例，已丢弃: key={}", kind, key);
                Vec::new()
            }
        }
    }
}

//! 组合根
//!
//! 全部服务在这里构造一次，用 Arc 显式传递给依赖方，不做任何全局查找
//! （数据库客户端是唯一的进程级例外）。装配顺序：存储 → 状态机 → 采样 →
//! 闸门 → 注册表 → 记录器 → 流水线 → 执行器 → 路由 → 触发通道。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::app_config::engine::EngineConfig;
use crate::app_config::{db, redis as app_redis};
use crate::trading::cache::{CacheProvider, TwoLevelCache};
use crate::trading::context::{AtomicContextSampler, DecisionReadStore};
use crate::trading::domain::{StrategyInstance, StrategyKind};
use crate::trading::executor::{InstanceKey, StripedSerialExecutor};
use crate::trading::guard::GuardChain;
use crate::trading::logic::StrategyLogicRegistry;
use crate::trading::model::strategy_config::StrategyConfigEntityModel;
use crate::trading::model::DbDecisionStore;
use crate::trading::recorder::{IntentRecorder, IntentWriteStore};
use crate::trading::router::{DecisionEventRouter, DecisionPipeline, InstanceLocator, TriggerChannel, TriggerPublisher};
use crate::trading::state::{RuntimeStateManager, StateAwareReadStore, StateWriteStore};

/// 装配完成的决策引擎
pub struct DecisionEngine {
    pub locator: Arc<InstanceLocator>,
    pub executor: Arc<StripedSerialExecutor>,
    pub state: Arc<RuntimeStateManager>,
    pub router: Arc<DecisionEventRouter>,
    channel: TriggerChannel,
    drain_timeout: Duration,
}

impl DecisionEngine {
    /// 上游事件源的发布句柄
    pub fn publisher(&self) -> TriggerPublisher {
        self.channel.publisher()
    }

    /// 优雅关闭：先排空触发通道，再限时排空各分片
    pub async fn shutdown(self) {
        info!("决策引擎开始关闭...");
        self.channel.shutdown(self.drain_timeout).await;
        self.executor.shutdown(self.drain_timeout).await;
        info!("决策引擎已关闭");
    }
}

/// 纯装配：给定配置与三个存储口，搭出完整引擎
///
/// 与环境、数据库解耦，集成测试用内存假存储直接复用这条装配线。
pub fn build_engine(
    cfg: &EngineConfig,
    read_store: Arc<dyn DecisionReadStore>,
    state_store: Arc<dyn StateWriteStore>,
    intent_store: Arc<dyn IntentWriteStore>,
) -> DecisionEngine {
    let state = Arc::new(RuntimeStateManager::new(state_store));

    let sampler_store = Arc::new(StateAwareReadStore::new(read_store, Arc::clone(&state)));
    let sampler = AtomicContextSampler::new(sampler_store);

    let dedup_cache: Arc<dyn CacheProvider<String>> = Arc::new(TwoLevelCache::new(
        "decision_dedup",
        cfg.dedup_capacity,
        cfg.dedup_ttl_secs,
        cfg.dedup_use_redis,
    ));
    let guards = GuardChain::standard(
        Arc::clone(&state),
        dedup_cache,
        cfg.staleness_secs,
        cfg.signal_max_age_secs,
        cfg.dedup_ttl_secs,
        cfg.price_cooldown_secs,
    );

    let registry = Arc::new(StrategyLogicRegistry::standard());
    let recorder = IntentRecorder::new(intent_store);

    let pipeline = Arc::new(DecisionPipeline::new(
        sampler,
        guards,
        registry,
        recorder,
        Arc::clone(&state),
    ));

    let executor = Arc::new(StripedSerialExecutor::new(
        cfg.effective_stripe_count(),
        cfg.queue_capacity,
    ));
    let locator = Arc::new(InstanceLocator::new());
    let router = Arc::new(DecisionEventRouter::new(
        Arc::clone(&locator),
        Arc::clone(&executor),
        pipeline,
    ));
    let channel = TriggerChannel::start(
        Arc::clone(&router),
        cfg.router_queue_capacity,
        cfg.router_workers,
    );

    DecisionEngine {
        locator,
        executor,
        state,
        router,
        channel,
        drain_timeout: Duration::from_secs(cfg.drain_timeout_secs),
    }
}

/// 从策略配置表装载启用中的实例并恢复其逻辑状态
pub async fn load_instances(
    engine: &DecisionEngine,
    read_store: &dyn DecisionReadStore,
) -> anyhow::Result<usize> {
    let configs = StrategyConfigEntityModel::new()
        .get_enabled_list()
        .await
        .context("获取启用策略配置失败")?;

    let mut loaded = 0usize;
    for config in configs {
        let key = match InstanceKey::new(config.id, config.trading_pair_id) {
            Ok(key) => key,
            Err(e) => {
                warn!("策略配置非法，跳过装载: id={}, err={}", config.id, e);
                continue;
            }
        };

        let restored = match read_store.read_logic_state(&key).await {
            Ok(state) => state,
            Err(e) => {
                error!("恢复逻辑状态失败，按初始态装载: key={}, err={}", key, e);
                None
            }
        };
        engine.state.seed(key, restored);
        engine.locator.register(StrategyInstance::new(
            key,
            config.user_id,
            StrategyKind::from_type_str(&config.strategy_type),
        ));
        loaded += 1;
    }
    info!("策略实例装载完成: count={}", loaded);
    Ok(loaded)
}

/// 应用入口总编排：配置 → 数据库 → 引擎装配 → 实例装载 → 信号等待 → 优雅关闭
pub async fn run(stripe_override: Option<usize>) -> anyhow::Result<()> {
    let mut cfg = EngineConfig::from_env();
    if let Some(stripes) = stripe_override {
        cfg.stripe_count = stripes;
    }
    info!("引擎配置: {:?}", cfg);
    if cfg.dedup_use_redis && !app_redis::redis_configured() {
        warn!("去重缓存要求Redis但未配置REDIS_HOST，降级为纯内存");
        cfg.dedup_use_redis = false;
    }

    db::init_db().await?;
    let db_store = Arc::new(DbDecisionStore::new());

    let engine = build_engine(
        &cfg,
        db_store.clone() as Arc<dyn DecisionReadStore>,
        db_store.clone() as Arc<dyn StateWriteStore>,
        db_store.clone() as Arc<dyn IntentWriteStore>,
    );
    load_instances(&engine, db_store.as_ref()).await?;

    // 发布句柄交给上游摄入层；此处仅保持引擎存活直至收到退出信号
    let _publisher = engine.publisher();

    let signal_name = wait_shutdown_signal().await;
    info!("接收到 {} 信号，开始优雅关闭...", signal_name);
    engine.shutdown().await;
    info!("应用已退出");
    Ok(())
}

/// 等待退出信号
async fn wait_shutdown_signal() -> &'static str {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
        "CTRL+C"
    }
}

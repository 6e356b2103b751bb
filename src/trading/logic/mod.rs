//! 策略逻辑插件层
//!
//! 每种策略类型对应一个 StrategyLogic 实现，注册表按类型字符串路由。
//! 未注册的类型路由到兜底逻辑（永远 HOLD），决策流程不会因此中断。

pub mod default_hold;
pub mod hybrid;
pub mod indicator_driven;
pub mod result;
pub mod signal_driven;

pub use default_hold::DefaultHoldLogic;
pub use hybrid::HybridLogic;
pub use indicator_driven::IndicatorDrivenLogic;
pub use result::{DecisionReason, DecisionResult};
pub use signal_driven::SignalDrivenLogic;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::trading::context::DecisionContext;
use crate::trading::domain::StrategyKind;

/// 策略逻辑接口
///
/// 实现必须无状态且线程安全，同一实例会被多个分片并发调用。
pub trait StrategyLogic: Send + Sync {
    /// 该逻辑负责的策略类型字符串
    fn supported_type(&self) -> &str;

    /// 基于决策上下文产出决策结果，不做任何 IO
    fn decide(&self, ctx: &DecisionContext) -> DecisionResult;
}

/// 策略逻辑注册表
///
/// 同类型重复注册时后注册者覆盖前者并告警。
pub struct StrategyLogicRegistry {
    logics: RwLock<HashMap<String, Arc<dyn StrategyLogic>>>,
    fallback: Arc<dyn StrategyLogic>,
}

impl Default for StrategyLogicRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StrategyLogicRegistry {
    pub fn new() -> Self {
        Self {
            logics: RwLock::new(HashMap::new()),
            fallback: Arc::new(DefaultHoldLogic),
        }
    }

    /// 内置全量逻辑：信号驱动、指标驱动、混合
    pub fn standard() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(SignalDrivenLogic));
        registry.register(Arc::new(IndicatorDrivenLogic::new()));
        registry.register(Arc::new(HybridLogic::new()));
        registry
    }

    pub fn register(&self, logic: Arc<dyn StrategyLogic>) {
        let type_str = logic.supported_type().to_string();
        let mut logics = self.logics.write().expect("RwLock poisoned");
        if logics.insert(type_str.clone(), logic).is_some() {
            warn!("策略逻辑重复注册，后注册者覆盖: type={}", type_str);
        } else {
            info!("注册策略逻辑: type={}", type_str);
        }
    }

    /// 按策略类型取逻辑，未注册时返回兜底逻辑
    pub fn get_logic(&self, kind: &StrategyKind) -> Arc<dyn StrategyLogic> {
        let logics = self.logics.read().expect("RwLock poisoned");
        match logics.get(kind.as_str()) {
            Some(logic) => Arc::clone(logic),
            None => {
                warn!("未找到策略逻辑实现，使用兜底HOLD: type={}", kind.as_str());
                Arc::clone(&self.fallback)
            }
        }
    }
}

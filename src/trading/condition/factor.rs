//! 因子解析
//!
//! 因子名按前缀路由到对应快照：BAR. / IND. / PX. / SIG. / STATE.。
//! 解析到 None 表示该因子此刻不可得（快照缺失或键不存在），
//! 未注册的前缀属于配置错误，单独区分。

use anyhow::{anyhow, Result};

use super::typed_value::TypedValue;
use crate::trading::context::DecisionContext;

pub trait FactorResolver: Send + Sync {
    fn prefix(&self) -> &'static str;

    /// name 是去掉前缀后的因子名
    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue>;
}

/// K线因子：BAR.OPEN / HIGH / LOW / CLOSE / VOLUME
pub struct BarFactorResolver;

impl FactorResolver for BarFactorResolver {
    fn prefix(&self) -> &'static str {
        "BAR."
    }

    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue> {
        let bar = ctx.bar.as_ref()?;
        let value = match name {
            "OPEN" => bar.open,
            "HIGH" => bar.high,
            "LOW" => bar.low,
            "CLOSE" => bar.close,
            "VOLUME" => bar.volume,
            _ => return None,
        };
        Some(TypedValue::Number(value))
    }
}

/// 指标因子：IND.<指标键>，直接查指标快照的值表
pub struct IndicatorFactorResolver;

impl FactorResolver for IndicatorFactorResolver {
    fn prefix(&self) -> &'static str {
        "IND."
    }

    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue> {
        ctx.indicator
            .as_ref()
            .and_then(|ind| ind.value(name))
            .map(TypedValue::Number)
    }
}

/// 价格因子：PX.LAST
pub struct PriceFactorResolver;

impl FactorResolver for PriceFactorResolver {
    fn prefix(&self) -> &'static str {
        "PX."
    }

    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue> {
        let price = ctx.price.as_ref()?;
        match name {
            "LAST" => Some(TypedValue::Number(price.last)),
            _ => None,
        }
    }
}

/// 信号因子：SIG.DIRECTION / ACTIVE
pub struct SignalFactorResolver;

impl FactorResolver for SignalFactorResolver {
    fn prefix(&self) -> &'static str {
        "SIG."
    }

    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue> {
        let signal = ctx.signal.as_ref()?;
        match name {
            "DIRECTION" => Some(TypedValue::from(signal.intent_direction.as_str())),
            "ACTIVE" => Some(TypedValue::Bool(signal.active)),
            _ => None,
        }
    }
}

/// 状态因子：STATE.PHASE / POSITION_SIDE / POSITION_QTY / AVG_ENTRY_PRICE
pub struct StateFactorResolver;

impl FactorResolver for StateFactorResolver {
    fn prefix(&self) -> &'static str {
        "STATE."
    }

    fn resolve(&self, ctx: &DecisionContext, name: &str) -> Option<TypedValue> {
        let state = &ctx.logic_state_before;
        match name {
            "PHASE" => Some(TypedValue::from(state.phase.as_str())),
            "POSITION_SIDE" => Some(TypedValue::from(state.position_side.as_str())),
            "POSITION_QTY" => Some(TypedValue::Number(state.position_qty)),
            "AVG_ENTRY_PRICE" => state.avg_entry_price.map(TypedValue::Number),
            _ => None,
        }
    }
}

/// 因子解析注册表，按前缀路由
pub struct FactorResolverRegistry {
    resolvers: Vec<Box<dyn FactorResolver>>,
}

impl FactorResolverRegistry {
    /// 内置全量解析器
    pub fn standard() -> Self {
        Self {
            resolvers: vec![
                Box::new(BarFactorResolver),
                Box::new(IndicatorFactorResolver),
                Box::new(PriceFactorResolver),
                Box::new(SignalFactorResolver),
                Box::new(StateFactorResolver),
            ],
        }
    }

    /// 解析因子值
    ///
    /// Ok(None) 表示因子此刻不可得；未注册前缀返回 Err（配置错误）。
    pub fn resolve(&self, ctx: &DecisionContext, factor: &str) -> Result<Option<TypedValue>> {
        for resolver in &self.resolvers {
            if let Some(name) = factor.strip_prefix(resolver.prefix()) {
                return Ok(resolver.resolve(ctx, name));
            }
        }
        Err(anyhow!("未注册的因子前缀: {}", factor))
    }
}

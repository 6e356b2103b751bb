//! 意图记录器
//!
//! 动作决策追加一条只增不改的审计记录；HOLD 只记日志，永不落库。
//! 写入失败记日志后继续，决策流水线不因审计失败中断或重试阻塞
//! （接受至多一次语义）。

pub mod reason;

pub use reason::serialize_reason;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::trading::context::DecisionContext;
use crate::trading::logic::DecisionResult;

/// 一条可落库的意图记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRecord {
    /// 进程内生成的追踪标识，审计排查用
    pub decision_id: String,
    pub user_id: i64,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub signal_intent_id: Option<i64>,
    pub action: String,
    pub order_qty: f64,
    pub reason_json: String,
    pub created_at: DateTime<Utc>,
}

/// 追加写入口：只增不改，不保证幂等（至多一次）
#[async_trait]
pub trait IntentWriteStore: Send + Sync {
    async fn append_intent_record(&self, record: &IntentRecord) -> Result<()>;
}

pub struct IntentRecorder {
    store: Arc<dyn IntentWriteStore>,
}

impl IntentRecorder {
    pub fn new(store: Arc<dyn IntentWriteStore>) -> Self {
        Self { store }
    }

    /// 记录一次决策
    ///
    /// HOLD 不产生记录；动作决策构建记录并追加，失败只记日志。
    pub async fn record(&self, ctx: &DecisionContext, result: &DecisionResult) {
        if result.is_hold() {
            debug!(
                "HOLD决策不落库: strategy_id={}, trading_pair_id={}, trigger={}",
                ctx.strategy_id,
                ctx.trading_pair_id,
                ctx.trigger_kind.as_str()
            );
            return;
        }

        let record = IntentRecord {
            decision_id: Uuid::new_v4().to_string(),
            user_id: ctx.user_id,
            strategy_id: ctx.strategy_id,
            trading_pair_id: ctx.trading_pair_id,
            signal_intent_id: ctx.signal.as_ref().map(|s| s.signal_intent_id),
            action: result.action.as_str().to_string(),
            order_qty: result.order_qty,
            reason_json: serialize_reason(ctx, result),
            created_at: Utc::now(),
        };

        match self.store.append_intent_record(&record).await {
            Ok(()) => {
                info!(
                    "意图记录已落库: decision_id={}, strategy_id={}, action={}, qty={}",
                    record.decision_id, record.strategy_id, record.action, record.order_qty
                );
            }
            Err(e) => {
                error!(
                    "意图记录落库失败（已放弃，不重试）: strategy_id={}, action={}, err={}",
                    record.strategy_id, record.action, e
                );
            }
        }
    }
}

use rbatis::rbdc::db::ExecResult;
use rbatis::{impl_insert, RBatis};
use tracing::debug;

use crate::app_config::db;

/// CREATE TABLE `strategy_intent_record` (
///   `id` bigint NOT NULL AUTO_INCREMENT,
///   `decision_id` varchar(36) NOT NULL,
///   `user_id` bigint NOT NULL,
///   `strategy_id` bigint NOT NULL,
///   `trading_pair_id` bigint NOT NULL,
///   `signal_intent_id` bigint DEFAULT NULL,
///   `action` varchar(16) NOT NULL,
///   `order_qty` double NOT NULL,
///   `reason_json` text NOT NULL,
///   `created_at` bigint NOT NULL,
///   PRIMARY KEY (`id`)
/// ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
///
/// 只增不改：本子系统不存在该表的 update/delete 路径，修正以新行表达。
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StrategyIntentRecordEntity {
    pub id: Option<i64>,
    pub decision_id: String,
    pub user_id: i64,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub signal_intent_id: Option<i64>,
    pub action: String,
    pub order_qty: f64,
    pub reason_json: String,
    pub created_at: i64,
}

impl_insert!(StrategyIntentRecordEntity {}, "strategy_intent_record");

pub struct StrategyIntentRecordEntityModel {
    db: &'static RBatis,
}

impl StrategyIntentRecordEntityModel {
    pub fn new() -> StrategyIntentRecordEntityModel {
        Self {
            db: db::get_db_client(),
        }
    }

    pub async fn append(&self, entity: StrategyIntentRecordEntity) -> anyhow::Result<ExecResult> {
        let data = StrategyIntentRecordEntity::insert(self.db, &entity).await?;
        debug!(
            "append strategy_intent_record: decision_id={}, action={}",
            entity.decision_id, entity.action
        );
        Ok(data)
    }
}

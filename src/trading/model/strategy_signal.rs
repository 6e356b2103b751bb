use rbatis::{crud, impl_select, RBatis};

use crate::app_config::db;

/// CREATE TABLE `strategy_signal` (
///   `id` bigint NOT NULL AUTO_INCREMENT,
///   `strategy_id` bigint NOT NULL,
///   `trading_pair_id` bigint NOT NULL,
///   `signal_intent_id` bigint NOT NULL,
///   `signal_id` bigint NOT NULL,
///   `intent_direction` varchar(16) NOT NULL,
///   `status` varchar(16) NOT NULL,
///   `activated_at` bigint NOT NULL,
///   `expire_at` bigint DEFAULT NULL,
///   PRIMARY KEY (`id`)
/// ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StrategySignalEntity {
    pub id: Option<i64>,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub signal_intent_id: i64,
    pub signal_id: i64,
    pub intent_direction: String,
    pub status: String,
    pub activated_at: i64,
    pub expire_at: Option<i64>,
}

crud!(StrategySignalEntity {}, "strategy_signal");
impl_select!(StrategySignalEntity{select_latest_active(strategy_id:i64,trading_pair_id:i64) =>
    "`where strategy_id=#{strategy_id} and trading_pair_id=#{trading_pair_id} and status='ACTIVE' order by activated_at desc limit 1`"},"strategy_signal");

pub struct StrategySignalEntityModel {
    db: &'static RBatis,
}

impl StrategySignalEntityModel {
    pub fn new() -> StrategySignalEntityModel {
        Self {
            db: db::get_db_client(),
        }
    }

    pub async fn get_latest_active(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> anyhow::Result<Option<StrategySignalEntity>> {
        let data =
            StrategySignalEntity::select_latest_active(self.db, strategy_id, trading_pair_id)
                .await?;
        Ok(data.into_iter().next())
    }
}

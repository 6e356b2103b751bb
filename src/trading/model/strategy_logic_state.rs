use rbatis::{crud, impl_select, impl_update, RBatis};
use tracing::debug;

use crate::app_config::db;

/// CREATE TABLE `strategy_logic_state` (
///   `id` bigint NOT NULL AUTO_INCREMENT,
///   `strategy_id` bigint NOT NULL,
///   `trading_pair_id` bigint NOT NULL,
///   `phase` varchar(32) NOT NULL,
///   `position_side` varchar(16) NOT NULL,
///   `position_qty` double NOT NULL,
///   `avg_entry_price` double DEFAULT NULL,
///   `state_hash` varchar(32) NOT NULL,
///   `updated_at` bigint NOT NULL,
///   PRIMARY KEY (`id`),
///   UNIQUE KEY `uk_instance` (`strategy_id`,`trading_pair_id`)
/// ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StrategyLogicStateEntity {
    pub id: Option<i64>,
    pub strategy_id: i64,
    pub trading_pair_id: i64,
    pub phase: String,
    pub position_side: String,
    pub position_qty: f64,
    pub avg_entry_price: Option<f64>,
    pub state_hash: String,
    pub updated_at: i64,
}

crud!(StrategyLogicStateEntity {}, "strategy_logic_state");
impl_select!(StrategyLogicStateEntity{select_by_instance(strategy_id:i64,trading_pair_id:i64) =>
    "`where strategy_id=#{strategy_id} and trading_pair_id=#{trading_pair_id}`"},"strategy_logic_state");
impl_update!(StrategyLogicStateEntity{update_by_instance(strategy_id:i64,trading_pair_id:i64) =>
    "`where strategy_id=#{strategy_id} and trading_pair_id=#{trading_pair_id}`"},"strategy_logic_state");

pub struct StrategyLogicStateEntityModel {
    db: &'static RBatis,
}

impl StrategyLogicStateEntityModel {
    pub fn new() -> StrategyLogicStateEntityModel {
        Self {
            db: db::get_db_client(),
        }
    }

    pub async fn get_by_instance(
        &self,
        strategy_id: i64,
        trading_pair_id: i64,
    ) -> anyhow::Result<Option<StrategyLogicStateEntity>> {
        let data =
            StrategyLogicStateEntity::select_by_instance(self.db, strategy_id, trading_pair_id)
                .await?;
        Ok(data.into_iter().next())
    }

    /// 按实例维度 upsert，不同实例来自不同分片的并发写互不干扰
    pub async fn upsert(&self, entity: StrategyLogicStateEntity) -> anyhow::Result<()> {
        let existing = self
            .get_by_instance(entity.strategy_id, entity.trading_pair_id)
            .await?;
        match existing {
            Some(_) => {
                StrategyLogicStateEntity::update_by_instance(
                    self.db,
                    &entity,
                    entity.strategy_id,
                    entity.trading_pair_id,
                )
                .await?;
                debug!(
                    "update strategy_logic_state: strategy_id={}, trading_pair_id={}",
                    entity.strategy_id, entity.trading_pair_id
                );
            }
            None => {
                StrategyLogicStateEntity::insert(self.db, &entity).await?;
                debug!(
                    "insert strategy_logic_state: strategy_id={}, trading_pair_id={}",
                    entity.strategy_id, entity.trading_pair_id
                );
            }
        }
        Ok(())
    }
}

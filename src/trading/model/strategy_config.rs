use rbatis::rbdc::db::ExecResult;
use rbatis::{crud, impl_select, RBatis};
use serde_json::json;
use tracing::debug;

use crate::app_config::db;

/// CREATE TABLE `strategy_config` (
///   `id` bigint NOT NULL AUTO_INCREMENT,
///   `user_id` bigint NOT NULL,
///   `trading_pair_id` bigint NOT NULL,
///   `strategy_type` varchar(64) NOT NULL,
///   `params_json` text NOT NULL,
///   `status` int NOT NULL DEFAULT 1,
///   `is_deleted` int NOT NULL DEFAULT 0,
///   PRIMARY KEY (`id`)
/// ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StrategyConfigEntity {
    pub id: i64,
    pub user_id: i64,
    pub trading_pair_id: i64,
    pub strategy_type: String,
    pub params_json: String,
    pub status: i32,
    pub is_deleted: i32,
}

crud!(StrategyConfigEntity {}, "strategy_config");
impl_select!(StrategyConfigEntity{get_enabled() => "`where status=1 and is_deleted=0`"},"strategy_config");
impl_select!(StrategyConfigEntity{select_by_id(id:i64) => "`where id=#{id} and is_deleted=0`"},"strategy_config");

pub struct StrategyConfigEntityModel {
    db: &'static RBatis,
}

impl StrategyConfigEntityModel {
    pub fn new() -> StrategyConfigEntityModel {
        Self {
            db: db::get_db_client(),
        }
    }

    pub async fn add(&self, entity: StrategyConfigEntity) -> anyhow::Result<ExecResult> {
        let data = StrategyConfigEntity::insert(self.db, &entity).await?;
        debug!("insert_strategy_config_result = {}", json!(data));
        Ok(data)
    }

    /// 启用中的全部策略配置，启动装载实例用
    pub async fn get_enabled_list(&self) -> anyhow::Result<Vec<StrategyConfigEntity>> {
        let data = StrategyConfigEntity::get_enabled(self.db).await?;
        debug!("query enabled strategy_config count={}", data.len());
        Ok(data)
    }

    pub async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<StrategyConfigEntity>> {
        let data = StrategyConfigEntity::select_by_id(self.db, id).await?;
        Ok(data.into_iter().next())
    }
}

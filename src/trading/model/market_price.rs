use rbatis::{crud, impl_select, RBatis};

use crate::app_config::db;

/// CREATE TABLE `market_price` (
///   `trading_pair_id` bigint NOT NULL,
///   `last_price` double NOT NULL,
///   `ts` bigint NOT NULL,
///   PRIMARY KEY (`trading_pair_id`)
/// ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
///
/// 行情摄入层维护的最新价镜像，本子系统只读。
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MarketPriceEntity {
    pub trading_pair_id: i64,
    pub last_price: f64,
    pub ts: i64,
}

crud!(MarketPriceEntity {}, "market_price");
impl_select!(MarketPriceEntity{select_by_pair(trading_pair_id:i64) =>
    "`where trading_pair_id=#{trading_pair_id}`"},"market_price");

pub struct MarketPriceEntityModel {
    db: &'static RBatis,
}

impl MarketPriceEntityModel {
    pub fn new() -> MarketPriceEntityModel {
        Self {
            db: db::get_db_client(),
        }
    }

    pub async fn get_by_pair(
        &self,
        trading_pair_id: i64,
    ) -> anyhow::Result<Option<MarketPriceEntity>> {
        let data = MarketPriceEntity::select_by_pair(self.db, trading_pair_id).await?;
        Ok(data.into_iter().next())
    }
}

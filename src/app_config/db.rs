use std::env;

use anyhow::{anyhow, Context};
use once_cell::sync::OnceCell;
use rbatis::RBatis;
use rbdc_mysql::MysqlDriver;

static DB_CLIENT: OnceCell<RBatis> = OnceCell::new();

pub async fn init_db() -> anyhow::Result<&'static RBatis> {
    let rb = RBatis::new();
    let dsn = env::var("DB_HOST").context("DB_HOST 未配置")?;
    rb.link(MysqlDriver {}, &dsn).await.context("数据库连接失败")?;
    // 按部署规模调整最大连接数
    if let Ok(pool) = rb.get_pool() {
        pool.set_max_open_conns(100).await;
    }

    DB_CLIENT
        .set(rb)
        .map_err(|_| anyhow!("DB_CLIENT 重复初始化"))?;
    Ok(get_db_client())
}

pub fn get_db_client() -> &'static RBatis {
    DB_CLIENT.get().expect("DB_CLIENT is not initialized")
}

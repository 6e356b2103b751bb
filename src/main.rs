use clap::Parser;
use dotenv::dotenv;

use quant_decision::app;
use quant_decision::app_config;

/// 决策调度引擎
#[derive(Parser, Debug)]
#[command(name = "quant_decision")]
struct Args {
    /// 覆盖分片数（默认取可用并行度）
    #[arg(long)]
    stripes: Option<usize>,

    /// 环境文件路径
    #[arg(long)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_filename(path).ok();
        }
        None => {
            dotenv().ok();
        }
    }

    app_config::log::setup_logging()?;
    app::bootstrap::run(args.stripes).await
}

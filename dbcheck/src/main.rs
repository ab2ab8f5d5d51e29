//! 数据库连通性检查
//!
//! 读取 JSON 连接配置，建立连接，执行 `SELECT 1`，输出连接池状态后断开。
//!
//! 配置文件路径取自第一个命令行参数或 `DBKIT_CONFIG` 环境变量。

use anyhow::{bail, Context};
use dbkit_adapter::ConnectionAdapter;
use dbkit_common::{ConnectionConfiguration, PoolSettings};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "DBKIT_CONFIG";

fn main() -> anyhow::Result<()> {
    // .env 必须在运行时启动前加载
    dotenvy::dotenv().ok();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    // 加载配置
    let path = match std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok()) {
        Some(path) => path,
        None => bail!("usage: dbcheck <config.json> (or set {})", CONFIG_ENV),
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file {}", path))?;
    let config = ConnectionConfiguration::from_json_str(&json)
        .with_context(|| format!("invalid configuration in {}", path))?;
    let settings = PoolSettings::from_env();

    // 建立连接并检查
    let adapter = ConnectionAdapter::with_settings(config, settings);
    let handle = adapter.connect().await.context("connection failed")?;

    let latency = handle.ping().await.context("ping failed")?;
    let stats = handle.pool_stats();
    info!(
        url = %handle.describe(),
        latency_ms = latency.as_millis() as u64,
        active = stats.active,
        idle = stats.idle,
        "连接正常"
    );
    println!("{} ok ({} ms)", handle.describe(), latency.as_millis());

    adapter.disconnect(&handle).await;
    Ok(())
}

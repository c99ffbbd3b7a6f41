//! 电能表采集网关：串口 Modbus RTU 轮询 → oneM2M 上报。

mod assembly;

use em_config::AppConfig;
use em_telemetry::init_tracing;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于现场直接启动
    dotenvy::dotenv().ok();
    // 初始化结构化日志
    init_tracing();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;

    let scheduler = assembly::build_scheduler(&config)?;

    // Ctrl-C：处理完当前设备后停止
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for shutdown signal");
                // 发送端关闭会让采集循环退出，这里保持其存活
                std::future::pending::<()>().await;
            }
        }
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}

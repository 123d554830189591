// ==========================================
// 玻璃深加工生产执行系统 - 主入口
// ==========================================
// 用法: glass-mes [db_path]
// 启动优化队列轮询，每次刷新输出日志，Ctrl-C 退出
// ==========================================

use std::time::Duration;

use anyhow::{anyhow, Context};
use glass_mes::app::{get_default_db_path, AppState, OptimizationQueuePoller};
use glass_mes::config::MesConfigReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    glass_mes::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", glass_mes::APP_NAME);
    tracing::info!("系统版本: {}", glass_mes::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径（命令行参数优先）
    let db_path = std::env::args()
        .nth(1)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let interval_secs = state
        .config
        .get_queue_poll_interval_secs()
        .await
        .map_err(|e| anyhow!(e.to_string()))
        .context("读取轮询间隔失败")?;
    match state.config.get_config_snapshot() {
        Ok(snapshot) => tracing::info!(config = %snapshot, "当前配置"),
        Err(e) => tracing::warn!("读取配置快照失败: {}", e),
    }

    let poller = OptimizationQueuePoller::spawn(
        state.optimization_api.clone(),
        Duration::from_secs(interval_secs),
    );

    let mut updates = poller.subscribe();
    let reporter = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match snapshot.error {
                Some(error) => tracing::warn!(error = %error, "优化队列刷新失败"),
                None => tracing::info!(
                    count = snapshot.layers.len(),
                    refreshed_at = ?snapshot.refreshed_at,
                    "待优化玻璃层"
                ),
            }
        }
    });

    tokio::signal::ctrl_c().await.context("监听 Ctrl-C 失败")?;
    tracing::info!("收到退出信号");

    poller.shutdown().await;
    reporter.abort();
    Ok(())
}
